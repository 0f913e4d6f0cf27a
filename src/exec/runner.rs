use crate::config::loader::RunnerConfig;
use crate::config::types::{OutputIntegrity, Result, RunOutcome};
use crate::exec::process::{run_with_deadline, ProcessSpec};
use crate::judge::JudgeAdapter;
use crate::utils::output::OutputLimits;
use std::path::Path;
use std::time::Duration;

/// Runner stage: executes an artifact against stdin under a deadline
#[derive(Debug, Clone)]
pub struct Runner {
    deadline: Duration,
    limits: OutputLimits,
}

impl Runner {
    pub fn new(deadline: Duration, limits: OutputLimits) -> Self {
        Self { deadline, limits }
    }

    pub fn from_config(config: &RunnerConfig, limits: OutputLimits) -> Self {
        Self::new(config.deadline(), limits)
    }

    /// Run `artifact` with `input` on stdin (no stdin content when empty).
    ///
    /// A program that cannot be started is reported as `exit_failed` with
    /// empty stderr, the same as one that fails silently.
    pub fn run(
        &self,
        adapter: &dyn JudgeAdapter,
        artifact: &Path,
        input: &str,
    ) -> Result<RunOutcome> {
        let argv = adapter.run_command(artifact);
        let spec = ProcessSpec {
            argv: &argv,
            stdin: (!input.is_empty()).then_some(input),
            capture_stdout: true,
            workdir: artifact.parent(),
            deadline: self.deadline,
        };

        let outcome = match run_with_deadline(&spec, &self.limits)? {
            Ok(outcome) => outcome,
            Err(spawn_err) => {
                log::warn!("{}", spawn_err);
                return Ok(RunOutcome {
                    exit_failed: true,
                    ..RunOutcome::default()
                });
            }
        };

        if outcome.timed_out {
            log::warn!(
                "Execution of {} exceeded {:?}",
                artifact.display(),
                self.deadline
            );
        }
        for (name, stream) in [("stdout", &outcome.stdout), ("stderr", &outcome.stderr)] {
            if stream.integrity != OutputIntegrity::Complete {
                log::warn!(
                    "Captured {} of {} is {}",
                    name,
                    artifact.display(),
                    stream.integrity
                );
            }
        }

        let exit_failed = !outcome.timed_out && !outcome.succeeded();
        Ok(RunOutcome {
            stdout: outcome.stdout.into_text(),
            stderr: outcome.stderr.into_text(),
            elapsed: outcome.elapsed,
            timed_out: outcome.timed_out,
            exit_failed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Runs the "artifact" path as a shell script
    struct ShellAdapter;

    impl JudgeAdapter for ShellAdapter {
        fn source_file_name(&self) -> &'static str {
            "main.sh"
        }

        fn artifact_file_name(&self) -> &'static str {
            "main.sh"
        }

        fn compile_command(&self, _source: &Path, _artifact: &Path) -> Vec<String> {
            vec!["true".to_string()]
        }

        fn run_command(&self, artifact: &Path) -> Vec<String> {
            vec!["/bin/sh".to_string(), artifact.to_string_lossy().to_string()]
        }
    }

    fn script(body: &str) -> tempfile::NamedTempFile {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    fn runner(deadline_ms: u64) -> Runner {
        Runner::new(Duration::from_millis(deadline_ms), OutputLimits::default())
    }

    #[test]
    fn test_success_keeps_stdout_verbatim() {
        let file = script("printf ' 42 \\n\\n'");
        let outcome = runner(5_000).run(&ShellAdapter, file.path(), "").unwrap();
        assert_eq!(outcome.stdout, " 42 \n\n");
        assert!(!outcome.timed_out);
        assert!(!outcome.exit_failed);
    }

    #[test]
    fn test_input_reaches_stdin() {
        let file = script("read x; echo $((x * 2))");
        let outcome = runner(5_000).run(&ShellAdapter, file.path(), "21").unwrap();
        assert_eq!(outcome.stdout, "42\n");
    }

    #[test]
    fn test_empty_input_means_no_stdin_content() {
        let file = script("if read x; then echo got; else echo eof; fi");
        let outcome = runner(5_000).run(&ShellAdapter, file.path(), "").unwrap();
        assert_eq!(outcome.stdout, "eof\n");
    }

    #[test]
    fn test_nonzero_exit_sets_exit_failed() {
        let file = script("printf boom >&2; exit 2");
        let outcome = runner(5_000).run(&ShellAdapter, file.path(), "").unwrap();
        assert!(outcome.exit_failed);
        assert!(!outcome.timed_out);
        assert_eq!(outcome.stderr, "boom");
    }

    #[test]
    fn test_timeout_is_not_exit_failed() {
        let file = script("printf partial; sleep 30");
        let outcome = runner(300).run(&ShellAdapter, file.path(), "").unwrap();
        assert!(outcome.timed_out);
        assert!(!outcome.exit_failed);
        assert!(outcome.elapsed >= Duration::from_millis(300));
    }

    #[test]
    fn test_missing_artifact_is_exit_failed() {
        struct Direct;
        impl JudgeAdapter for Direct {
            fn source_file_name(&self) -> &'static str {
                "main.cpp"
            }
            fn artifact_file_name(&self) -> &'static str {
                "main"
            }
            fn compile_command(&self, _: &Path, _: &Path) -> Vec<String> {
                Vec::new()
            }
            fn run_command(&self, artifact: &Path) -> Vec<String> {
                vec![artifact.to_string_lossy().to_string()]
            }
        }

        let outcome = runner(1_000)
            .run(&Direct, Path::new("/nonexistent/main"), "")
            .unwrap();
        assert!(outcome.exit_failed);
        assert_eq!(outcome.stderr, "");
    }
}
