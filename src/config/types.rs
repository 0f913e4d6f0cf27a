/// Core types and structures for the execbox pipeline
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Summary placed in `error` when the toolchain rejects the source.
pub const COMPILATION_FAILED: &str = "Compilation failed";
/// Summary placed in `error` when the program fails at runtime.
pub const RUNTIME_ERROR_OCCURRED: &str = "Runtime error occurred";
/// Fixed `runtime_error` text for a run that hit its deadline.
pub const EXECUTION_TIMEOUT: &str = "Execution timeout";

/// Supported source languages. The set is closed: exactly one variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "cpp")]
    Cpp,
}

impl Language {
    pub fn identifier(self) -> &'static str {
        match self {
            Language::Cpp => "cpp",
        }
    }
}

impl FromStr for Language {
    type Err = ExecError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cpp" => Ok(Language::Cpp),
            other => Err(ExecError::UnsupportedLanguage(other.to_string())),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

/// A validated execution request.
///
/// Only constructible through [`ExecutionRequest::new`], so holding one means
/// the code is non-empty and the language is supported.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionRequest {
    code: String,
    test_input: String,
    language: Language,
}

impl ExecutionRequest {
    /// Validate request shape first, then the language gate.
    pub fn new(
        code: impl Into<String>,
        language: &str,
        test_input: impl Into<String>,
    ) -> Result<Self> {
        let code = code.into();
        if code.is_empty() {
            return Err(ExecError::Validation("code must not be empty".to_string()));
        }
        let language = language.parse::<Language>()?;

        Ok(Self {
            code,
            test_input: test_input.into(),
            language,
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn test_input(&self) -> &str {
        &self.test_input
    }

    pub fn language(&self) -> Language {
        self.language
    }
}

/// Result of the compiler stage
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompileOutcome {
    /// Toolchain exited zero and produced the artifact
    Compiled(PathBuf),
    /// Toolchain stderr, unmodified
    Failed(String),
}

/// Result of the runner stage
#[derive(Clone, Debug, Default)]
pub struct RunOutcome {
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
    pub timed_out: bool,
    pub exit_failed: bool,
}

/// Output integrity classification for a captured stream
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum OutputIntegrity {
    #[default]
    #[serde(rename = "complete")]
    Complete,
    #[serde(rename = "truncated_by_limit")]
    TruncatedByLimit,
    #[serde(rename = "read_error")]
    ReadError,
    #[serde(rename = "collection_timeout")]
    CollectionTimeout,
}

impl fmt::Display for OutputIntegrity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputIntegrity::Complete => write!(f, "complete"),
            OutputIntegrity::TruncatedByLimit => write!(f, "truncated_by_limit"),
            OutputIntegrity::ReadError => write!(f, "read_error"),
            OutputIntegrity::CollectionTimeout => write!(f, "collection_timeout"),
        }
    }
}

/// Terminal state of one pipeline run
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// Program exited zero
    #[serde(rename = "OK")]
    Ok,
    /// Toolchain rejected the source
    #[serde(rename = "CE")]
    CompileError,
    /// Run deadline fired
    #[serde(rename = "TLE")]
    TimeLimit,
    /// Program exited non-zero or could not complete
    #[serde(rename = "RE")]
    RuntimeError,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStatus::Ok => write!(f, "OK"),
            ExecutionStatus::CompileError => write!(f, "CE"),
            ExecutionStatus::TimeLimit => write!(f, "TLE"),
            ExecutionStatus::RuntimeError => write!(f, "RE"),
        }
    }
}

/// Advisory resource figures.
///
/// `memory_kb` is the resident set of the orchestrating process, not the
/// child. `cpu_ms` is the wall-clock duration of the run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResourceUsage {
    pub memory_kb: u64,
    pub cpu_ms: u64,
}

impl ResourceUsage {
    pub fn memory_usage(&self) -> String {
        format!("{} KB", self.memory_kb)
    }

    pub fn cpu_usage(&self) -> String {
        format!("{} ms", self.cpu_ms)
    }
}

/// Classified pipeline outcome; one variant per terminal state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Succeeded { output: String },
    CompileFailed { diagnostic: String },
    TimedOut { partial_output: String },
    ExitFailed { output: String, stderr: String },
}

/// Value returned to the caller for every request that entered the pipeline
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionResult {
    pub verdict: Verdict,
    pub usage: ResourceUsage,
}

impl ExecutionResult {
    pub fn compile_failed(diagnostic: String, usage: ResourceUsage) -> Self {
        Self {
            verdict: Verdict::CompileFailed { diagnostic },
            usage,
        }
    }

    /// Map a runner outcome. The deadline takes priority over exit status.
    pub fn from_run(run: RunOutcome, usage: ResourceUsage) -> Self {
        let verdict = if run.timed_out {
            Verdict::TimedOut {
                partial_output: run.stdout,
            }
        } else if run.exit_failed {
            Verdict::ExitFailed {
                output: run.stdout,
                stderr: run.stderr,
            }
        } else {
            Verdict::Succeeded { output: run.stdout }
        };
        Self { verdict, usage }
    }

    pub fn status(&self) -> ExecutionStatus {
        match self.verdict {
            Verdict::Succeeded { .. } => ExecutionStatus::Ok,
            Verdict::CompileFailed { .. } => ExecutionStatus::CompileError,
            Verdict::TimedOut { .. } => ExecutionStatus::TimeLimit,
            Verdict::ExitFailed { .. } => ExecutionStatus::RuntimeError,
        }
    }

    pub fn output(&self) -> &str {
        match &self.verdict {
            Verdict::Succeeded { output } | Verdict::ExitFailed { output, .. } => output,
            Verdict::TimedOut { partial_output } => partial_output,
            Verdict::CompileFailed { .. } => "",
        }
    }

    /// Human summary, empty on success
    pub fn error(&self) -> &str {
        match self.verdict {
            Verdict::Succeeded { .. } => "",
            Verdict::CompileFailed { .. } => COMPILATION_FAILED,
            Verdict::TimedOut { .. } | Verdict::ExitFailed { .. } => RUNTIME_ERROR_OCCURRED,
        }
    }

    pub fn compile_error(&self) -> Option<&str> {
        match &self.verdict {
            Verdict::CompileFailed { diagnostic } => Some(diagnostic),
            _ => None,
        }
    }

    pub fn runtime_error(&self) -> Option<&str> {
        match &self.verdict {
            Verdict::TimedOut { .. } => Some(EXECUTION_TIMEOUT),
            Verdict::ExitFailed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

/// Wire shape of a result as returned by the HTTP and CLI surfaces
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutionResponse {
    pub output: String,
    pub error: String,
    pub memory_usage: String,
    pub cpu_usage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compile_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_error: Option<String>,
}

impl ExecutionResponse {
    /// Generic failure body for errors raised before a verdict exists
    pub fn failure(err: &ExecError) -> Self {
        Self {
            error: format!("Execution failed: {}", err),
            ..Self::default()
        }
    }
}

impl From<&ExecutionResult> for ExecutionResponse {
    fn from(result: &ExecutionResult) -> Self {
        Self {
            output: result.output().to_string(),
            error: result.error().to_string(),
            memory_usage: result.usage.memory_usage(),
            cpu_usage: result.usage.cpu_usage(),
            compile_error: result.compile_error().map(str::to_string),
            runtime_error: result.runtime_error().map(str::to_string),
        }
    }
}

/// Custom error types for execbox
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Workspace error: {0}")]
    Workspace(String),

    #[error("Toolchain error: {0}")]
    Toolchain(String),

    #[error("Process error: {0}")]
    Process(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ExecError {
    /// Errors raised before the pipeline is entered
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ExecError::Validation(_) | ExecError::UnsupportedLanguage(_)
        )
    }
}

impl From<nix::errno::Errno> for ExecError {
    fn from(err: nix::errno::Errno) -> Self {
        ExecError::Process(err.to_string())
    }
}

/// Result type alias for execbox operations
pub type Result<T> = std::result::Result<T, ExecError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn usage() -> ResourceUsage {
        ResourceUsage {
            memory_kb: 2048,
            cpu_ms: 12,
        }
    }

    #[test]
    fn test_request_rejects_empty_code() {
        let err = ExecutionRequest::new("", "cpp", "").unwrap_err();
        assert!(matches!(err, ExecError::Validation(_)));
        assert!(err.is_rejection());
    }

    #[test]
    fn test_request_rejects_other_languages() {
        for lang in ["python", "c++", "CPP", ""] {
            let err = ExecutionRequest::new("int main(){}", lang, "").unwrap_err();
            assert!(matches!(err, ExecError::UnsupportedLanguage(_)), "{lang}");
        }
    }

    #[test]
    fn test_request_accepts_empty_input() {
        let req = ExecutionRequest::new("int main(){}", "cpp", "").unwrap();
        assert_eq!(req.language(), Language::Cpp);
        assert_eq!(req.test_input(), "");
    }

    #[test]
    fn test_timeout_takes_priority_over_exit_failure() {
        let run = RunOutcome {
            stdout: "partial".to_string(),
            stderr: "killed".to_string(),
            elapsed: Duration::from_secs(5),
            timed_out: true,
            exit_failed: true,
        };
        let result = ExecutionResult::from_run(run, usage());
        assert_eq!(result.status(), ExecutionStatus::TimeLimit);
        assert_eq!(result.runtime_error(), Some(EXECUTION_TIMEOUT));
        assert_eq!(result.error(), RUNTIME_ERROR_OCCURRED);
        assert_eq!(result.compile_error(), None);
    }

    #[test]
    fn test_exit_failure_passes_stderr_through() {
        let run = RunOutcome {
            exit_failed: true,
            ..RunOutcome::default()
        };
        let result = ExecutionResult::from_run(run, usage());
        assert_eq!(result.status(), ExecutionStatus::RuntimeError);
        assert_eq!(result.runtime_error(), Some(""));

        let wire = ExecutionResponse::from(&result);
        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(json["runtime_error"], "");
        assert!(json.get("compile_error").is_none());
    }

    #[test]
    fn test_success_response_omits_error_fields() {
        let run = RunOutcome {
            stdout: "42".to_string(),
            ..RunOutcome::default()
        };
        let wire = ExecutionResponse::from(&ExecutionResult::from_run(run, usage()));
        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(json["output"], "42");
        assert_eq!(json["error"], "");
        assert_eq!(json["memory_usage"], "2048 KB");
        assert_eq!(json["cpu_usage"], "12 ms");
        assert!(json.get("compile_error").is_none());
        assert!(json.get("runtime_error").is_none());
    }

    #[test]
    fn test_compile_failure_has_empty_output() {
        let result = ExecutionResult::compile_failed("error: 'x'".to_string(), usage());
        assert_eq!(result.output(), "");
        assert_eq!(result.error(), COMPILATION_FAILED);
        assert_eq!(result.compile_error(), Some("error: 'x'"));
        assert_eq!(result.runtime_error(), None);
    }

    #[test]
    fn test_failure_body() {
        let err = ExecError::Workspace("disk full".to_string());
        let body = ExecutionResponse::failure(&err);
        assert_eq!(body.error, "Execution failed: Workspace error: disk full");
        assert!(body.output.is_empty());
    }
}
