/// Service configuration loading from a JSON file
use crate::config::types::{ExecError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Toolchain invocation for the compiler stage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CompilerConfig {
    pub path: String,
    pub args: Vec<String>,
    pub deadline_ms: u64,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            path: "g++".to_string(),
            args: vec!["-Wall".to_string()],
            deadline_ms: 10_000,
        }
    }
}

impl CompilerConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunnerConfig {
    pub deadline_ms: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self { deadline_ms: 5_000 }
    }
}

impl RunnerConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}

/// Capture bounds for child stdout/stderr
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutputConfig {
    pub stdout_limit: usize,
    pub stderr_limit: usize,
    /// How long to wait for collectors after the child is gone
    pub collection_timeout_ms: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            stdout_limit: 8 * 1024 * 1024,
            stderr_limit: 2 * 1024 * 1024,
            collection_timeout_ms: 1_000,
        }
    }
}

/// Full service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServiceConfig {
    pub bind_addr: String,
    pub workspace_root: PathBuf,
    pub compiler: CompilerConfig,
    pub runner: RunnerConfig,
    pub output: OutputConfig,
    /// Work areas older than this are swept at startup
    pub stale_workspace_max_age_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            workspace_root: Self::runtime_root_dir(),
            compiler: CompilerConfig::default(),
            runner: RunnerConfig::default(),
            output: OutputConfig::default(),
            stale_workspace_max_age_secs: 3_600,
        }
    }
}

impl ServiceConfig {
    /// Runtime root directory scoped by effective UID.
    /// Keeps root and non-root services from sharing one work tree.
    pub fn runtime_root_dir() -> PathBuf {
        let euid = nix::unistd::geteuid();
        std::env::temp_dir().join(format!("execbox-uid-{}", euid))
    }

    /// Load configuration from a JSON file; absent keys take defaults
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ExecError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        serde_json::from_str(&content)
            .map_err(|e| ExecError::Config(format!("Failed to parse config JSON: {}", e)))
    }

    /// Load from `path` when given, otherwise use defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let config = Self::load_from_file(path)?;
                log::info!("Loaded configuration from {}", path.display());
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn stale_workspace_max_age(&self) -> Duration {
        Duration::from_secs(self.stale_workspace_max_age_secs)
    }
}
