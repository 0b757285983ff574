//! Harness — the coding-agent adapter contract and the subprocess plumbing
//! that drives it.
//!
//! This crate is the seam between the task orchestrator and an opaque
//! coding-agent subprocess: it owns the stream-of-events/final-outcome
//! contract, a real subprocess implementation that speaks it over piped
//! stdio, a scripted stub for tests, and commit message generation for
//! completed tasks.

pub mod adapter;
pub mod commit_message;
pub mod stub;
pub mod subprocess;
