//! Process gates: structural checks run before any subprocess is launched.
//!
//! Neither gate calls an LLM or shells out — both are pure heuristics over
//! data already in memory, so a blocking issue is surfaced before the
//! engine spends any wall-clock time dispatching work.

use chopstack_core::plan::Plan;
use chopstack_core::validate::ValidationReport;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Critical,
    Warning,
}

#[derive(Debug, Clone, Serialize)]
pub struct GateIssue {
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GateReport {
    pub blocking: Vec<GateIssue>,
    pub warnings: Vec<GateIssue>,
}

impl GateReport {
    pub fn passed(&self) -> bool {
        self.blocking.is_empty()
    }
}

const MIN_SPEC_LENGTH: usize = 200;
const REQUIRED_SECTION_MARKERS: &[&str] = &["#", "goal", "requirement"];

/// Pre-generation gate: flags a specification that's too thin to decompose
/// into a plan — empty, under the minimum length, or missing every marker
/// a structured spec would normally carry (a heading, a stated goal, or an
/// explicit requirements section).
pub fn check_spec_gaps(spec_text: &str) -> GateReport {
    let mut report = GateReport::default();
    let trimmed = spec_text.trim();

    if trimmed.is_empty() {
        report.blocking.push(GateIssue {
            severity: Severity::Critical,
            message: "specification text is empty".to_string(),
        });
        return report;
    }

    if trimmed.len() < MIN_SPEC_LENGTH {
        report.blocking.push(GateIssue {
            severity: Severity::Critical,
            message: format!(
                "specification is only {} characters, below the {}-character minimum for decomposition",
                trimmed.len(),
                MIN_SPEC_LENGTH
            ),
        });
    }

    let lower = trimmed.to_lowercase();
    let has_any_marker = REQUIRED_SECTION_MARKERS.iter().any(|m| lower.contains(m));
    if !has_any_marker {
        report.blocking.push(GateIssue {
            severity: Severity::Critical,
            message: "specification has no heading, goal, or requirements section".to_string(),
        });
    }

    report
}

/// Post-generation gate: layers on top of a plan's [`ValidationReport`].
/// Every validation error is critical; orphaned tasks and borderline-thin
/// descriptions are warnings, since a human reviewing the plan may
/// legitimately accept them.
pub fn check_plan_quality(plan: &Plan, validation: &ValidationReport) -> GateReport {
    let mut report = GateReport::default();

    for error in &validation.errors {
        report.blocking.push(GateIssue {
            severity: Severity::Critical,
            message: error.clone(),
        });
    }

    if let Some(orphans) = &validation.orphaned_tasks {
        for id in orphans {
            report.warnings.push(GateIssue {
                severity: Severity::Warning,
                message: format!("task '{id}' has no dependencies and nothing depends on it"),
            });
        }
    }

    for task in &plan.tasks {
        if task.description.trim().len() < 70 {
            report.warnings.push(GateIssue {
                severity: Severity::Warning,
                message: format!(
                    "task '{}' description is only slightly over the minimum length; consider expanding it",
                    task.id
                ),
            });
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use chopstack_core::plan::{Complexity, Plan, PlanStrategy, Task, TaskState};
    use chopstack_core::validate::validate_plan;
    use std::collections::HashSet;

    #[test]
    fn empty_spec_is_a_blocking_gap() {
        let report = check_spec_gaps("");
        assert!(!report.passed());
    }

    #[test]
    fn short_spec_without_markers_fails_twice() {
        let report = check_spec_gaps("too short");
        assert_eq!(report.blocking.len(), 2);
    }

    #[test]
    fn adequate_spec_passes() {
        let spec = format!("# Goal\n\n{}\n\n## Requirements\nDo the thing.", "filler ".repeat(40));
        let report = check_spec_gaps(&spec);
        assert!(report.passed());
    }

    fn task(id: &str, description_len: usize) -> Task {
        Task {
            id: id.into(),
            name: id.into(),
            description: "d".repeat(description_len),
            complexity: Complexity::S,
            acceptance_criteria: Vec::new(),
            files: vec![format!("{id}.rs")],
            dependencies: HashSet::new(),
            phase: None,
            state: TaskState::Pending,
            retry_count: 0,
            max_retries: 0,
            state_history: Vec::new(),
            commit_hash: None,
            branch_name: None,
            worktree_path: None,
        }
    }

    #[test]
    fn validation_errors_become_critical_gate_issues() {
        let plan = Plan {
            name: "p".into(),
            strategy: PlanStrategy::Parallel,
            phases: None,
            tasks: vec![],
            success_metrics: None,
            mode: None,
        };
        let validation = validate_plan(&plan);
        let report = check_plan_quality(&plan, &validation);
        assert!(!report.passed());
    }

    #[test]
    fn borderline_description_is_a_warning_not_blocking() {
        let plan = Plan {
            name: "p".into(),
            strategy: PlanStrategy::Parallel,
            phases: None,
            tasks: vec![task("a", 55)],
            success_metrics: None,
            mode: None,
        };
        let validation = validate_plan(&plan);
        let report = check_plan_quality(&plan, &validation);
        assert!(report.passed());
        assert!(!report.warnings.is_empty());
    }
}
