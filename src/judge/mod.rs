//! Judge adapters.
//!
//! The pipeline stays language-agnostic. Adapters define the fixed file
//! names and the compile/run invocations for each language.

pub mod adapter;
pub mod languages;
pub mod registry;

pub use adapter::JudgeAdapter;
pub use registry::adapter_for;
