//! The coding-agent adapter contract: an opaque subprocess that reads a
//! prompt from stdin and produces a stream of structured events plus a
//! final file-change result.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Thinking { text: String },
    ToolUse { name: String, input: serde_json::Value },
    Text { text: String },
    Error { message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterRequest {
    pub task_id: String,
    pub prompt: String,
    pub cwd: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterOutcome {
    pub exit_code: i32,
    pub files_changed: Vec<String>,
    pub stderr: Option<String>,
}

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("failed to spawn adapter process: {0}")]
    Spawn(String),
    #[error("adapter produced malformed stream event: {0}")]
    MalformedEvent(String),
    #[error("io error communicating with adapter: {0}")]
    Io(String),
    #[error("adapter was cancelled")]
    Cancelled,
}

/// A handle to one in-flight adapter invocation. Implementations decide how
/// events are delivered (channel, callback, etc.); the orchestrator only
/// needs to poll for the next event and, eventually, the final outcome.
#[async_trait::async_trait]
pub trait AdapterHandle: Send {
    /// Returns the next stream event, or `None` once the adapter process
    /// has exited and every buffered event has been drained.
    async fn next_event(&mut self) -> Result<Option<StreamEvent>, AdapterError>;

    /// Waits for the adapter process to exit and returns its final result.
    /// Only valid to call after `next_event` has returned `None`.
    async fn wait(self: Box<Self>) -> Result<AdapterOutcome, AdapterError>;

    /// Requests termination of the underlying process.
    async fn terminate(&mut self) -> Result<(), AdapterError>;
}

/// Spawns a coding-agent subprocess for a task and returns a handle to its
/// event stream. Implementations are expected to write `request.prompt` to
/// the child's stdin rather than passing it as an argument, to accommodate
/// arbitrarily large prompts.
#[async_trait::async_trait]
pub trait ExecutionAdapter: Send + Sync {
    async fn spawn(&self, request: AdapterRequest) -> Result<Box<dyn AdapterHandle>, AdapterError>;

    /// Name used in logs and the `adapter` CLI flag (e.g. `"claude-code"`).
    fn name(&self) -> &str;
}
