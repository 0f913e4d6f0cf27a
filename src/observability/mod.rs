//! Observability
//!
//! Pipeline metrics and advisory resource sampling.

pub mod metrics;
pub mod usage;
