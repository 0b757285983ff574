//! The single-consumer renderer: subscribes to every topic and formats
//! events according to a verbosity mode. Purely a formatter — it holds no
//! scheduling state and never feeds decisions back into the bus.

use crate::event_bus::EventBus;
use crate::protocol::BusEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Errors and task start/complete only.
    Quiet,
    /// Adds progress events.
    Normal,
    /// Adds stream data and VCS events.
    Verbose,
}

pub struct Renderer {
    mode: RenderMode,
}

impl Renderer {
    pub fn new(mode: RenderMode) -> Self {
        Self { mode }
    }

    /// Render one event to a line of output, or `None` if this event is
    /// filtered out at the current verbosity.
    pub fn render(&self, event: &BusEvent) -> Option<String> {
        use BusEvent::*;
        match (self.mode, event) {
            (_, TaskStart { task_id, .. }) => Some(format!("[{task_id}] started")),
            (_, TaskComplete { task_id, result }) => Some(format!(
                "[{task_id}] {}",
                if result.success { "completed" } else { "completed (no changes)" }
            )),
            (_, TaskFailed { task_id, error }) => Some(format!("[{task_id}] failed: {error}")),

            (RenderMode::Quiet, _) => None,

            (_, TaskProgress { task_id, phase, message }) => Some(format!(
                "[{task_id}] {phase:?}{}",
                message.as_ref().map(|m| format!(": {m}")).unwrap_or_default()
            )),
            (_, Log { level, message, .. }) => Some(format!("{level:?}: {message}")),

            (RenderMode::Normal, _) => None,

            (RenderMode::Verbose, StreamData { task_id, event }) => {
                Some(format!("[{task_id}] {event:?}"))
            }
            (RenderMode::Verbose, VcsBranchCreated { branch_name, parent_branch }) => {
                Some(format!("branch created: {branch_name} (from {parent_branch})"))
            }
            (RenderMode::Verbose, VcsCommit { branch_name, message, files_changed }) => Some(format!(
                "commit on {branch_name}: {message} ({} files)",
                files_changed.len()
            )),
        }
    }

    /// Drain `rx` until the bus side is dropped, printing each rendered
    /// line to stdout. Intended for the CLI's default run; tests should
    /// call [`Renderer::render`] directly instead.
    pub fn run_to_stdout(&self, rx: flume::Receiver<BusEvent>) {
        for event in rx.iter() {
            if let Some(line) = self.render(&event) {
                println!("{line}");
            }
        }
    }
}

pub fn subscribe_renderer(bus: &EventBus, mode: RenderMode) -> (Renderer, flume::Receiver<BusEvent>) {
    (Renderer::new(mode), bus.subscribe())
}
