use std::path::Path;

use chopstack_engine::gates::check_spec_gaps;

use super::print_gate_report;

/// Run the pre-generation gate against a specification file, before any
/// decomposition into a plan is attempted.
pub fn spec(spec_path: &Path, json: bool) -> anyhow::Result<bool> {
    let text = std::fs::read_to_string(spec_path)
        .map_err(|e| anyhow::anyhow!("could not read spec file {}: {e}", spec_path.display()))?;
    let report = check_spec_gaps(&text);
    let failed = print_gate_report(&report, json)?;
    Ok(!failed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thin_spec_fails_the_gate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spec.md");
        std::fs::write(&path, "too short").unwrap();
        assert!(!spec(&path, true).unwrap());
    }

    #[test]
    fn adequate_spec_passes_the_gate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spec.md");
        std::fs::write(
            &path,
            format!("# Goal\n\n{}\n\n## Requirements\nDo the thing.", "filler ".repeat(40)),
        )
        .unwrap();
        assert!(spec(&path, true).unwrap());
    }
}
