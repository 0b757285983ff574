//! The execution engine: layered scheduling over a validated plan, plus the
//! process gates run before and after plan generation.

pub mod engine;
pub mod gates;
