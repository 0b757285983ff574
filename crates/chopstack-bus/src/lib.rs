//! Typed multi-producer multi-consumer publish/subscribe for task
//! lifecycle, streaming agent output, log records, and VCS operations,
//! plus the renderer that turns those events into terminal output.

pub mod event_bus;
pub mod protocol;
pub mod renderer;
