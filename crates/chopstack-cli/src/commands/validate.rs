use std::path::Path;

use chopstack_core::plan::parse_file;
use chopstack_core::validate::validate_plan;
use chopstack_engine::gates::check_plan_quality;

use super::print_gate_report;

/// Parse a plan file, run the structural validator and the post-generation
/// quality gate, and report the result. Returns `true` if the plan is safe
/// to execute.
pub fn run(plan_path: &Path, json: bool) -> anyhow::Result<bool> {
    let text = std::fs::read_to_string(plan_path)
        .map_err(|e| anyhow::anyhow!("could not read plan file {}: {e}", plan_path.display()))?;
    let parsed = parse_file(plan_path, &text)
        .map_err(|e| anyhow::anyhow!("could not parse plan file {}: {e}", plan_path.display()))?;

    for warning in &parsed.warnings {
        eprintln!("warning: {warning}");
    }

    let validation = validate_plan(&parsed.plan);
    let report = check_plan_quality(&parsed.plan, &validation);
    let failed = print_gate_report(&report, json)?;
    Ok(!failed)
}
