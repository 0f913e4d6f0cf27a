//! Execution control
//!
//! Deadline-bound child processes, the compile and run stages built on them,
//! and the orchestrator that sequences both inside a work area.

pub mod compiler;
pub mod orchestrator;
pub mod process;
pub mod runner;

pub use compiler::Compiler;
pub use orchestrator::Orchestrator;
pub use runner::Runner;
