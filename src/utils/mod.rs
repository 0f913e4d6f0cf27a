//! Utilities
//!
//! Bounded collection of child process output.

pub mod output;
