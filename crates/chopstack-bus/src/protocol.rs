//! The typed event vocabulary published on the bus: task lifecycle,
//! streaming agent output, log records, and VCS operations.

use chopstack_harness::adapter::StreamEvent;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskProgressPhase {
    Queued,
    Executing,
    Integrating,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskCompleteOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files_changed: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "topic", rename_all = "snake_case")]
pub enum BusEvent {
    #[serde(rename = "task:start")]
    TaskStart { task_id: String, workdir: String },
    #[serde(rename = "task:progress")]
    TaskProgress {
        task_id: String,
        phase: TaskProgressPhase,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    #[serde(rename = "task:complete")]
    TaskComplete {
        task_id: String,
        result: TaskCompleteOutcome,
    },
    #[serde(rename = "task:failed")]
    TaskFailed { task_id: String, error: String },
    #[serde(rename = "stream:data")]
    StreamData { task_id: String, event: StreamEvent },
    #[serde(rename = "log")]
    Log {
        level: LogLevel,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        metadata: Option<serde_json::Value>,
    },
    #[serde(rename = "vcs:branch-created")]
    VcsBranchCreated {
        branch_name: String,
        parent_branch: String,
    },
    #[serde(rename = "vcs:commit")]
    VcsCommit {
        branch_name: String,
        message: String,
        files_changed: Vec<String>,
    },
}

impl BusEvent {
    pub fn task_id(&self) -> Option<&str> {
        match self {
            BusEvent::TaskStart { task_id, .. }
            | BusEvent::TaskProgress { task_id, .. }
            | BusEvent::TaskComplete { task_id, .. }
            | BusEvent::TaskFailed { task_id, .. }
            | BusEvent::StreamData { task_id, .. } => Some(task_id),
            _ => None,
        }
    }
}
