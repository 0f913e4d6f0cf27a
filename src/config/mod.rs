//! Configuration and shared types
//!
//! Service settings, their startup validation, and the request/result
//! vocabulary shared by every stage.

pub mod loader;
pub mod types;
pub mod validator;
