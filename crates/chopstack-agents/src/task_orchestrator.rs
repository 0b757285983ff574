//! Per-task execution: dispatches to an execution adapter, pipes the
//! streaming event channel onto the bus, applies per-task timeout and
//! cancellation, and produces a final [`OrchestratorTaskResult`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chopstack_bus::event_bus::EventBus;
use chopstack_bus::protocol::{BusEvent, TaskCompleteOutcome};
use chopstack_harness::adapter::{AdapterRequest, ExecutionAdapter};
use dashmap::DashMap;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("adapter error: {0}")]
    Adapter(#[from] chopstack_harness::adapter::AdapterError),
    #[error("no running task with id: {0}")]
    NotRunning(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Success,
    Failure,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct TaskRequest {
    pub task_id: String,
    pub title: String,
    pub prompt: String,
    pub files: Vec<String>,
    pub workdir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct OrchestratorTaskResult {
    pub task_id: String,
    pub status: TaskStatus,
    pub duration: Duration,
    pub error: Option<String>,
    pub files_changed: Option<Vec<String>>,
}

/// Drives one coding-agent subprocess invocation from dispatch to terminal
/// state, publishing every lifecycle event onto the bus.
pub struct TaskOrchestrator {
    adapter: Arc<dyn ExecutionAdapter>,
    bus: EventBus,
    /// Maximum gap between stream events before the task is treated as
    /// stalled and cancelled.
    pub inactivity_timeout: Duration,
    /// Maximum total wall time for a single task.
    pub wall_clock_timeout: Duration,
    running: Arc<DashMap<String, CancellationToken>>,
}

impl TaskOrchestrator {
    pub fn new(adapter: Arc<dyn ExecutionAdapter>, bus: EventBus) -> Self {
        Self {
            adapter,
            bus,
            inactivity_timeout: Duration::from_secs(120),
            wall_clock_timeout: Duration::from_secs(60 * 20),
            running: Arc::new(DashMap::new()),
        }
    }

    pub fn with_timeouts(mut self, inactivity: Duration, wall_clock: Duration) -> Self {
        self.inactivity_timeout = inactivity;
        self.wall_clock_timeout = wall_clock;
        self
    }

    /// Request cancellation of a running task by id. No-op if the task is
    /// not currently running (e.g. it already finished).
    pub fn cancel(&self, task_id: &str) {
        if let Some(token) = self.running.get(task_id) {
            token.cancel();
        }
    }

    /// Cancel every task currently running under this orchestrator.
    pub fn cancel_all(&self) {
        for entry in self.running.iter() {
            entry.value().cancel();
        }
    }

    pub async fn run_task(&self, request: TaskRequest) -> OrchestratorTaskResult {
        let start = Instant::now();
        let token = CancellationToken::new();
        self.running.insert(request.task_id.clone(), token.clone());

        self.bus.publish(BusEvent::TaskStart {
            task_id: request.task_id.clone(),
            workdir: request.workdir.display().to_string(),
        });

        let result = self.drive(&request, &token).await;
        self.running.remove(&request.task_id);

        let duration = start.elapsed();
        match &result {
            Ok((status, files_changed)) => {
                if *status == TaskStatus::Success {
                    self.bus.publish(BusEvent::TaskComplete {
                        task_id: request.task_id.clone(),
                        result: TaskCompleteOutcome {
                            success: true,
                            files_changed: files_changed.clone(),
                        },
                    });
                }
                OrchestratorTaskResult {
                    task_id: request.task_id,
                    status: *status,
                    duration,
                    error: None,
                    files_changed: files_changed.clone(),
                }
            }
            Err(error) => {
                self.bus.publish(BusEvent::TaskFailed {
                    task_id: request.task_id.clone(),
                    error: error.to_string(),
                });
                OrchestratorTaskResult {
                    task_id: request.task_id,
                    status: TaskStatus::Failure,
                    duration,
                    error: Some(error.to_string()),
                    files_changed: None,
                }
            }
        }
    }

    async fn drive(
        &self,
        request: &TaskRequest,
        token: &CancellationToken,
    ) -> Result<(TaskStatus, Option<Vec<String>>), OrchestratorError> {
        let mut handle = self
            .adapter
            .spawn(AdapterRequest {
                task_id: request.task_id.clone(),
                prompt: request.prompt.clone(),
                cwd: request.workdir.clone(),
            })
            .await?;

        let deadline = tokio::time::Instant::now() + self.wall_clock_timeout;

        loop {
            tokio::select! {
                biased;

                _ = token.cancelled() => {
                    warn!(task_id = %request.task_id, "task cancelled, terminating adapter");
                    let _ = handle.terminate().await;
                    self.bus.publish(BusEvent::TaskFailed {
                        task_id: request.task_id.clone(),
                        error: "cancelled".to_string(),
                    });
                    return Ok((TaskStatus::Cancelled, None));
                }

                _ = tokio::time::sleep_until(deadline) => {
                    warn!(task_id = %request.task_id, "wall-clock timeout exceeded");
                    let _ = handle.terminate().await;
                    return Err(OrchestratorError::Adapter(
                        chopstack_harness::adapter::AdapterError::Cancelled,
                    ));
                }

                next = tokio::time::timeout(self.inactivity_timeout, handle.next_event()) => {
                    match next {
                        Ok(Ok(Some(event))) => {
                            self.bus.publish(BusEvent::StreamData {
                                task_id: request.task_id.clone(),
                                event,
                            });
                        }
                        Ok(Ok(None)) => {
                            let outcome = handle.wait().await?;
                            info!(task_id = %request.task_id, exit_code = outcome.exit_code, "adapter exited");
                            return if outcome.exit_code == 0 {
                                Ok((TaskStatus::Success, Some(outcome.files_changed)))
                            } else {
                                Err(OrchestratorError::Adapter(
                                    chopstack_harness::adapter::AdapterError::Io(
                                        outcome.stderr.unwrap_or_else(|| format!("exit code {}", outcome.exit_code)),
                                    ),
                                ))
                            };
                        }
                        Ok(Err(e)) => return Err(OrchestratorError::Adapter(e)),
                        Err(_elapsed) => {
                            warn!(task_id = %request.task_id, "inactivity timeout exceeded");
                            let _ = handle.terminate().await;
                            return Err(OrchestratorError::Adapter(
                                chopstack_harness::adapter::AdapterError::Cancelled,
                            ));
                        }
                    }
                }
            }
        }
    }
}
