//! A scripted adapter for tests and dry runs: returns a fixed sequence of
//! events and a fixed outcome without spawning any process.

use std::sync::Mutex;

use crate::adapter::{AdapterError, AdapterHandle, AdapterOutcome, AdapterRequest, ExecutionAdapter, StreamEvent};

pub struct StubAdapter {
    events: Vec<StreamEvent>,
    outcome: AdapterOutcome,
}

impl StubAdapter {
    pub fn new(events: Vec<StreamEvent>, outcome: AdapterOutcome) -> Self {
        Self { events, outcome }
    }

    pub fn succeeding(files_changed: Vec<String>) -> Self {
        Self::new(
            vec![StreamEvent::Text {
                text: "done".to_string(),
            }],
            AdapterOutcome {
                exit_code: 0,
                files_changed,
                stderr: None,
            },
        )
    }

    pub fn failing(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(
            vec![StreamEvent::Error {
                message: message.clone(),
            }],
            AdapterOutcome {
                exit_code: 1,
                files_changed: Vec::new(),
                stderr: Some(message),
            },
        )
    }
}

#[async_trait::async_trait]
impl ExecutionAdapter for StubAdapter {
    async fn spawn(&self, _request: AdapterRequest) -> Result<Box<dyn AdapterHandle>, AdapterError> {
        Ok(Box::new(StubHandle {
            events: Mutex::new(self.events.clone().into_iter()),
            outcome: self.outcome.clone(),
        }))
    }

    fn name(&self) -> &str {
        "stub"
    }
}

struct StubHandle {
    events: Mutex<std::vec::IntoIter<StreamEvent>>,
    outcome: AdapterOutcome,
}

#[async_trait::async_trait]
impl AdapterHandle for StubHandle {
    async fn next_event(&mut self) -> Result<Option<StreamEvent>, AdapterError> {
        Ok(self.events.get_mut().unwrap().next())
    }

    async fn wait(self: Box<Self>) -> Result<AdapterOutcome, AdapterError> {
        Ok(self.outcome)
    }

    async fn terminate(&mut self) -> Result<(), AdapterError> {
        Ok(())
    }
}
