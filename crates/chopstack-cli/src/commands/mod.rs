pub mod config;
pub mod execute;
pub mod gates;
pub mod validate;

use chopstack_engine::gates::GateReport;

/// Print a [`GateReport`] either as pretty JSON or as a short human summary,
/// then return whether the caller should treat this as a failure.
pub fn print_gate_report(report: &GateReport, json: bool) -> anyhow::Result<bool> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        for issue in &report.blocking {
            println!("blocking: {}", issue.message);
        }
        for issue in &report.warnings {
            println!("warning:  {}", issue.message);
        }
        if report.blocking.is_empty() && report.warnings.is_empty() {
            println!("no issues found");
        }
    }
    Ok(!report.passed())
}
