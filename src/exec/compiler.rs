use crate::config::loader::CompilerConfig;
use crate::config::types::{CompileOutcome, ExecError, Result};
use crate::exec::process::{run_with_deadline, ProcessSpec};
use crate::judge::JudgeAdapter;
use crate::utils::output::OutputLimits;
use std::path::Path;
use std::time::Duration;

/// Compiler stage: source file to artifact or diagnostic text
#[derive(Debug, Clone)]
pub struct Compiler {
    deadline: Duration,
    limits: OutputLimits,
}

impl Compiler {
    pub fn new(deadline: Duration, limits: OutputLimits) -> Self {
        Self { deadline, limits }
    }

    pub fn from_config(config: &CompilerConfig, limits: OutputLimits) -> Self {
        Self::new(config.deadline(), limits)
    }

    /// Compile `source` into `artifact`.
    ///
    /// Any non-zero exit, including a deadline kill, is `Failed` carrying the
    /// toolchain's stderr. Toolchain stdout is discarded. Only a toolchain that
    /// cannot be started at all is an error.
    pub fn compile(
        &self,
        adapter: &dyn JudgeAdapter,
        source: &Path,
        artifact: &Path,
    ) -> Result<CompileOutcome> {
        let argv = adapter.compile_command(source, artifact);
        let spec = ProcessSpec {
            argv: &argv,
            stdin: None,
            capture_stdout: false,
            workdir: source.parent(),
            deadline: self.deadline,
        };

        let outcome = run_with_deadline(&spec, &self.limits)?
            .map_err(|e| ExecError::Toolchain(e.to_string()))?;

        if outcome.timed_out {
            log::warn!(
                "Compilation of {} exceeded {:?}",
                source.display(),
                self.deadline
            );
        }

        if outcome.succeeded() {
            log::debug!(
                "Compiled {} in {} ms",
                source.display(),
                outcome.elapsed.as_millis()
            );
            Ok(CompileOutcome::Compiled(artifact.to_path_buf()))
        } else {
            Ok(CompileOutcome::Failed(outcome.stderr.into_text()))
        }
    }
}
