// Config Validation
// Startup validation of deadlines, capture limits and the toolchain entry.
// Errors are fatal; warnings are logged by the caller.

use crate::config::loader::ServiceConfig;
use crate::config::types::{ExecError, Result};

/// Validation result with detailed errors
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, error: String) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate config at startup, failing fast with every error found
pub fn validate_config(config: &ServiceConfig) -> Result<ValidationResult> {
    let mut result = ValidationResult::new();

    validate_deadlines(config, &mut result);
    validate_output(config, &mut result);
    validate_compiler(config, &mut result);

    if !result.is_valid() {
        return Err(ExecError::Config(format!(
            "Config validation failed:\n{}",
            result.errors.join("\n")
        )));
    }

    Ok(result)
}

fn validate_deadlines(config: &ServiceConfig, result: &mut ValidationResult) {
    if config.compiler.deadline_ms == 0 {
        result.add_error("compiler.deadline_ms cannot be zero".to_string());
    }
    if config.runner.deadline_ms == 0 {
        result.add_error("runner.deadline_ms cannot be zero".to_string());
    }

    if config.runner.deadline_ms >= config.compiler.deadline_ms {
        result.add_warning(format!(
            "runner.deadline_ms ({}) is not shorter than compiler.deadline_ms ({})",
            config.runner.deadline_ms, config.compiler.deadline_ms
        ));
    }
}

fn validate_output(config: &ServiceConfig, result: &mut ValidationResult) {
    if config.output.stdout_limit == 0 {
        result.add_error("output.stdout_limit cannot be zero".to_string());
    }
    if config.output.stderr_limit == 0 {
        result.add_error("output.stderr_limit cannot be zero".to_string());
    }
    if config.output.collection_timeout_ms == 0 {
        result.add_warning(
            "output.collection_timeout_ms is zero, captured streams may come back empty"
                .to_string(),
        );
    }
}

fn validate_compiler(config: &ServiceConfig, result: &mut ValidationResult) {
    if config.compiler.path.trim().is_empty() {
        result.add_error("compiler.path cannot be empty".to_string());
    }
    for arg in &config.compiler.args {
        if arg == "-o" {
            result.add_error(
                "compiler.args must not contain -o, the artifact path is fixed".to_string(),
            );
        }
    }
}
