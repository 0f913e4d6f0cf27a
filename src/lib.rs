//! execbox: compile and run single-file C++ submissions under deadlines
//!
//! # Architecture
//!
//! ## Execution Control ([`exec`])
//! - [`exec::process`]: Deadline-bound child processes in their own process group
//! - [`exec::compiler`]: Source to artifact, with diagnostics on failure
//! - [`exec::runner`]: Artifact execution with stdin, output capture and timeout
//! - [`exec::orchestrator`]: Validate, compile, run, clean up
//!
//! ## Judge Adapters ([`judge`])
//! - [`judge::adapter`]: Per-language file names and command lines
//! - [`judge::registry`]: Language to adapter lookup
//!
//! ## Safety & Cleanup ([`safety`])
//! - [`safety::workspace`]: Request-scoped work areas and stale sweep
//!
//! ## Observability ([`observability`])
//! - [`observability::metrics`]: Prometheus metrics export
//! - [`observability::usage`]: Advisory memory and time figures
//!
//! ## Configuration ([`config`])
//! - [`config::loader`]: Service configuration loading
//! - [`config::validator`]: Configuration checks
//! - [`config::types`]: Shared type definitions and closed enums
//!
//! ## Utilities ([`utils`])
//! - [`utils::output`]: Bounded output collection
//!
//! ## Surfaces
//! - [`server`]: HTTP API (`POST /run`, `GET /health`, `GET /metrics`)
//! - [`cli`]: `serve`, `execute-code` and `check-deps`
//!
//! Submissions run as the service user with no isolation beyond their own
//! process group and work area. Deploy behind an external sandbox.

// Execution Control
pub mod exec;

// Judge adapters (language-specific compile/run envelopes)
pub mod judge;

// Safety & Cleanup
pub mod safety;

// Observability
pub mod observability;

// Configuration
pub mod config;

// Utilities
pub mod utils;

// HTTP surface
pub mod server;

// CLI entrypoint wiring
pub mod cli;

// Re-export commonly used types for convenience
pub use config::types::*;
pub use exec::Orchestrator;
pub use server::Server;
