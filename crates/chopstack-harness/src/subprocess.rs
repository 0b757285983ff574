//! The default [`ExecutionAdapter`]: a plain OS subprocess communicating
//! over piped stdio. The prompt is written to stdin; stdout is read as
//! line-delimited JSON, one [`StreamEvent`] per line, with one final line
//! (distinguished by carrying `files_changed` rather than `type`) reporting
//! the file-change set once the agent is done.

use std::process::Stdio;

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};

use crate::adapter::{AdapterError, AdapterHandle, AdapterOutcome, AdapterRequest, ExecutionAdapter, StreamEvent};

#[derive(Debug, Deserialize)]
struct FinalLine {
    files_changed: Vec<String>,
    #[serde(default)]
    stderr: Option<String>,
}

pub struct SubprocessAdapter {
    binary: String,
    args: Vec<String>,
}

impl SubprocessAdapter {
    pub fn new(binary: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            binary: binary.into(),
            args,
        }
    }
}

#[async_trait::async_trait]
impl ExecutionAdapter for SubprocessAdapter {
    async fn spawn(&self, request: AdapterRequest) -> Result<Box<dyn AdapterHandle>, AdapterError> {
        let mut child = Command::new(&self.binary)
            .args(&self.args)
            .current_dir(&request.cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AdapterError::Spawn(e.to_string()))?;

        let mut stdin = child.stdin.take().expect("piped stdin");
        let prompt = request.prompt.clone();
        tokio::spawn(async move {
            let _ = stdin.write_all(prompt.as_bytes()).await;
            let _ = stdin.shutdown().await;
        });

        let stdout = child.stdout.take().expect("piped stdout");
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (final_tx, final_rx) = oneshot::channel();

        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            let mut last_final: Option<FinalLine> = None;
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        if let Ok(event) = serde_json::from_str::<StreamEvent>(&line) {
                            let _ = events_tx.send(event);
                        } else if let Ok(final_line) = serde_json::from_str::<FinalLine>(&line) {
                            last_final = Some(final_line);
                        }
                    }
                    Ok(None) => break,
                    Err(_) => break,
                }
            }
            let _ = final_tx.send(last_final);
        });

        Ok(Box::new(SubprocessAdapterHandle {
            child,
            events_rx,
            final_rx: Some(final_rx),
        }))
    }

    fn name(&self) -> &str {
        &self.binary
    }
}

struct SubprocessAdapterHandle {
    child: Child,
    events_rx: mpsc::UnboundedReceiver<StreamEvent>,
    final_rx: Option<oneshot::Receiver<Option<FinalLine>>>,
}

#[async_trait::async_trait]
impl AdapterHandle for SubprocessAdapterHandle {
    async fn next_event(&mut self) -> Result<Option<StreamEvent>, AdapterError> {
        Ok(self.events_rx.recv().await)
    }

    async fn wait(mut self: Box<Self>) -> Result<AdapterOutcome, AdapterError> {
        let status = self
            .child
            .wait()
            .await
            .map_err(|e| AdapterError::Io(e.to_string()))?;

        let final_line = match self.final_rx.take() {
            Some(rx) => rx.await.unwrap_or(None),
            None => None,
        };

        Ok(AdapterOutcome {
            exit_code: status.code().unwrap_or(-1),
            files_changed: final_line.as_ref().map(|f| f.files_changed.clone()).unwrap_or_default(),
            stderr: final_line.and_then(|f| f.stderr),
        })
    }

    async fn terminate(&mut self) -> Result<(), AdapterError> {
        self.child.start_kill().map_err(|e| AdapterError::Io(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spawns_echo_and_reads_stream_events() {
        // `cat` echoes stdin to stdout, letting us drive the adapter
        // contract end-to-end without a real coding agent.
        let adapter = SubprocessAdapter::new("cat", Vec::new());
        let request = AdapterRequest {
            task_id: "t1".into(),
            prompt: "{\"type\":\"text\",\"text\":\"hello\"}\n{\"files_changed\":[\"a.rs\"]}\n".into(),
            cwd: std::env::temp_dir(),
        };

        let mut handle = adapter.spawn(request).await.unwrap();
        let mut events = Vec::new();
        while let Some(event) = handle.next_event().await.unwrap() {
            events.push(event);
        }
        let outcome = handle.wait().await.unwrap();

        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], StreamEvent::Text { .. }));
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.files_changed, vec!["a.rs".to_string()]);
    }
}
