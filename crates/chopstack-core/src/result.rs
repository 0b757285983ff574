//! The outcome of a run: per-task results, branches and commits produced,
//! and the retry history the execution engine accumulated along the way.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOutcome {
    Success,
    Failure,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResultEntry {
    pub task_id: String,
    pub outcome: TaskOutcome,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub commit_hash: Option<String>,
}

/// One retry attempt for a task, recorded so a run's history shows what
/// context each attempt was given without duplicating the full prompt text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryRecord {
    pub task_id: String,
    pub attempt: u32,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub plan_name: String,
    pub total_duration_ms: u64,
    pub tasks: Vec<TaskResultEntry>,
    pub branches: Vec<String>,
    pub commits: Vec<String>,
    pub pr_urls: Vec<String>,
    pub logs_path: Option<PathBuf>,
    pub retries: Vec<RetryRecord>,
}

impl ExecutionResult {
    pub fn new(plan_name: impl Into<String>) -> Self {
        Self {
            plan_name: plan_name.into(),
            total_duration_ms: 0,
            tasks: Vec::new(),
            branches: Vec::new(),
            commits: Vec::new(),
            pr_urls: Vec::new(),
            logs_path: None,
            retries: Vec::new(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.tasks
            .iter()
            .all(|t| !matches!(t.outcome, TaskOutcome::Failure))
    }

    pub fn failed_tasks(&self) -> impl Iterator<Item = &TaskResultEntry> {
        self.tasks
            .iter()
            .filter(|t| matches!(t.outcome, TaskOutcome::Failure))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn succeeds_when_no_task_failed() {
        let mut result = ExecutionResult::new("demo");
        result.tasks.push(TaskResultEntry {
            task_id: "a".into(),
            outcome: TaskOutcome::Success,
            duration_ms: 10,
            error: None,
            commit_hash: Some("abc123".into()),
        });
        result.tasks.push(TaskResultEntry {
            task_id: "b".into(),
            outcome: TaskOutcome::Skipped,
            duration_ms: 0,
            error: None,
            commit_hash: None,
        });
        assert!(result.succeeded());
        assert_eq!(result.failed_tasks().count(), 0);
    }

    #[test]
    fn fails_when_any_task_failed() {
        let mut result = ExecutionResult::new("demo");
        result.tasks.push(TaskResultEntry {
            task_id: "a".into(),
            outcome: TaskOutcome::Failure,
            duration_ms: 10,
            error: Some("boom".into()),
            commit_hash: None,
        });
        assert!(!result.succeeded());
        assert_eq!(result.failed_tasks().count(), 1);
    }
}
