//! Telemetry and observability infrastructure for Chopstack.
//!
//! This crate provides a unified observability layer combining logging,
//! metrics, and span correlation. It integrates with the `tracing`
//! ecosystem for structured logging and spans, and exposes Prometheus- and
//! JSON-compatible metrics for task/layer/retry counts and durations.
//!
//! Key components:
//! - **Logging**: Human-readable and JSON-formatted output via `tracing-subscriber`
//! - **Metrics**: Thread-safe counters, gauges, and histograms with Prometheus export
//! - **Tracing**: trace/span ID generation for correlating a run's logs across tasks

pub mod logging;
pub mod metrics;
pub mod tracing_setup;
