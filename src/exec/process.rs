/// Child process launch under a wall-clock deadline
///
/// The child leads its own process group so the deadline kill reaches every
/// helper and descendant it spawned.
use crate::config::types::{ExecError, Result};
use crate::utils::output::{spawn_collector, CapturedStream, OutputLimits};
use crossbeam_channel::{bounded, Receiver};
use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::io::Write;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// What to launch and how
#[derive(Debug, Clone)]
pub struct ProcessSpec<'a> {
    pub argv: &'a [String],
    /// Written to stdin when present; otherwise stdin is null
    pub stdin: Option<&'a str>,
    /// When false stdout goes to /dev/null
    pub capture_stdout: bool,
    pub workdir: Option<&'a Path>,
    pub deadline: Duration,
}

/// What happened to the child
#[derive(Debug)]
pub struct ProcessOutcome {
    /// `None` when the exit status could not be observed
    pub status: Option<ExitStatus>,
    pub stdout: CapturedStream,
    pub stderr: CapturedStream,
    pub elapsed: Duration,
    pub timed_out: bool,
}

impl ProcessOutcome {
    pub fn succeeded(&self) -> bool {
        !self.timed_out && self.status.is_some_and(|s| s.success())
    }
}

/// Launch failure, kept apart from `ExecError` so each stage can classify it
#[derive(Debug)]
pub struct SpawnError {
    pub program: String,
    pub source: std::io::Error,
}

impl std::fmt::Display for SpawnError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to spawn {}: {}", self.program, self.source)
    }
}

/// Run a child to completion or until its deadline fires.
///
/// Returns `Ok(Err(_))` when the program could not be started at all.
pub fn run_with_deadline(
    spec: &ProcessSpec<'_>,
    limits: &OutputLimits,
) -> Result<std::result::Result<ProcessOutcome, SpawnError>> {
    let program = spec
        .argv
        .first()
        .ok_or_else(|| ExecError::Process("Empty command provided".to_string()))?;

    let mut cmd = Command::new(program);
    cmd.args(&spec.argv[1..])
        .stdin(if spec.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(if spec.capture_stdout {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stderr(Stdio::piped())
        .process_group(0);
    if let Some(dir) = spec.workdir {
        cmd.current_dir(dir);
    }

    let started = Instant::now();
    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(source) => {
            return Ok(Err(SpawnError {
                program: program.clone(),
                source,
            }))
        }
    };

    let feeder = match (spec.stdin, child.stdin.take()) {
        (Some(input), Some(stdin)) => Some(feed_stdin(stdin, input.to_string())),
        _ => None,
    };
    let stdout = child
        .stdout
        .take()
        .map(|s| spawn_collector(s, limits.stdout_limit));
    let stderr = child
        .stderr
        .take()
        .map(|s| spawn_collector(s, limits.stderr_limit));

    let (status, timed_out) = wait_with_deadline(&mut child, started, spec.deadline)?;
    let elapsed = started.elapsed();

    // Stragglers that outlived the leader still hold the pipes open.
    kill_group(&child);

    let collect_deadline = Instant::now() + limits.collection_timeout;
    let stdout = stdout
        .map(|p| p.finish(collect_deadline))
        .unwrap_or_default();
    let stderr = stderr
        .map(|p| p.finish(collect_deadline))
        .unwrap_or_default();
    if let Some(feeder) = feeder {
        feeder.finish(collect_deadline);
    }

    Ok(Ok(ProcessOutcome {
        status,
        stdout,
        stderr,
        elapsed,
        timed_out,
    }))
}

fn wait_with_deadline(
    child: &mut Child,
    started: Instant,
    deadline: Duration,
) -> Result<(Option<ExitStatus>, bool)> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok((Some(status), false)),
            Ok(None) => {
                if started.elapsed() >= deadline {
                    log::debug!("Deadline of {:?} reached for pid {}", deadline, child.id());
                    kill_group(child);
                    let _ = child.kill();
                    let status = child.wait().ok();
                    return Ok((status, true));
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                kill_group(child);
                let _ = child.kill();
                let _ = child.wait();
                return Err(ExecError::Process(format!("wait failed: {}", e)));
            }
        }
    }
}

fn kill_group(child: &Child) {
    let pgid = Pid::from_raw(child.id() as i32);
    match killpg(pgid, Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => log::warn!("killpg({}) failed: {}", pgid, e),
    }
}

/// Stdin writer thread; signals `done` once the input is written or refused
struct PendingFeed {
    done: Receiver<()>,
    handle: JoinHandle<()>,
}

impl PendingFeed {
    /// A writer still blocked at `deadline` (stdin handed to an escaped
    /// descendant that never reads) is abandoned.
    fn finish(self, deadline: Instant) {
        match self.done.recv_deadline(deadline) {
            Ok(()) => {
                let _ = self.handle.join();
            }
            Err(_) => log::warn!("Stdin writer did not finish before deadline, abandoning it"),
        }
    }
}

/// Write `input` on its own thread so a child that never reads cannot
/// block the wait loop; stdin is closed once written.
fn feed_stdin(mut stdin: ChildStdin, input: String) -> PendingFeed {
    let (tx, done) = bounded(1);
    let handle = thread::spawn(move || {
        if let Err(e) = stdin.write_all(input.as_bytes()) {
            if e.kind() != std::io::ErrorKind::BrokenPipe {
                log::debug!("Writing child stdin failed: {}", e);
            }
        }
        drop(stdin);
        let _ = tx.send(());
    });
    PendingFeed { done, handle }
}
