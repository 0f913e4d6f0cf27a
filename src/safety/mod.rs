//! Safety and cleanup
//!
//! Request-scoped work areas with guaranteed release.

pub mod workspace;

pub use workspace::{WorkArea, WorkspaceManager};
