/// Bounded output collection for child process streams
///
/// Each stream is drained on its own thread so a chatty child can never
/// block on a full pipe. Bytes past the limit are read and discarded.
use crate::config::loader::OutputConfig;
use crate::config::types::OutputIntegrity;
use crossbeam_channel::{bounded, Receiver};
use std::io::Read;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Output limits configuration
#[derive(Debug, Clone)]
pub struct OutputLimits {
    /// Per-stream stdout limit (bytes)
    pub stdout_limit: usize,
    /// Per-stream stderr limit (bytes)
    pub stderr_limit: usize,
    /// How long collectors may keep running once the child is gone
    pub collection_timeout: Duration,
}

impl Default for OutputLimits {
    fn default() -> Self {
        Self::from(&OutputConfig::default())
    }
}

impl From<&OutputConfig> for OutputLimits {
    fn from(config: &OutputConfig) -> Self {
        Self {
            stdout_limit: config.stdout_limit,
            stderr_limit: config.stderr_limit,
            collection_timeout: Duration::from_millis(config.collection_timeout_ms),
        }
    }
}

/// Bytes captured from one stream
#[derive(Debug, Clone, Default)]
pub struct CapturedStream {
    pub data: Vec<u8>,
    pub integrity: OutputIntegrity,
}

impl CapturedStream {
    pub fn into_text(self) -> String {
        match String::from_utf8(self.data) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }
    }
}

/// Bytes read so far, shared with the collector thread
#[derive(Debug, Default)]
struct SharedCapture {
    data: Vec<u8>,
    integrity: OutputIntegrity,
}

fn lock(shared: &Mutex<SharedCapture>) -> MutexGuard<'_, SharedCapture> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A stream whose collector thread is still running
pub struct PendingStream {
    shared: Arc<Mutex<SharedCapture>>,
    done: Receiver<()>,
    handle: JoinHandle<()>,
}

impl PendingStream {
    /// Wait for the collector until `deadline`.
    ///
    /// A collector still blocked after the deadline (a pipe kept open by an
    /// escaped descendant) is abandoned. Whatever it had read by then is
    /// returned, marked `CollectionTimeout`.
    pub fn finish(self, deadline: Instant) -> CapturedStream {
        match self.done.recv_deadline(deadline) {
            Ok(()) => {
                let _ = self.handle.join();
                let mut shared = lock(&self.shared);
                CapturedStream {
                    data: std::mem::take(&mut shared.data),
                    integrity: shared.integrity,
                }
            }
            Err(_) => {
                log::warn!("Output collector did not finish before deadline, abandoning it");
                let shared = lock(&self.shared);
                CapturedStream {
                    data: shared.data.clone(),
                    integrity: OutputIntegrity::CollectionTimeout,
                }
            }
        }
    }
}

/// Start draining `stream` on a dedicated thread, keeping at most `limit` bytes
pub fn spawn_collector<R: Read + Send + 'static>(stream: R, limit: usize) -> PendingStream {
    let shared = Arc::new(Mutex::new(SharedCapture::default()));
    let (tx, done) = bounded(1);
    let sink = Arc::clone(&shared);
    let handle = thread::spawn(move || {
        collect_stream(stream, limit, &sink);
        let _ = tx.send(());
    });
    PendingStream {
        shared,
        done,
        handle,
    }
}

/// Drain a single stream into `sink`, chunk by chunk, up to `limit` bytes
fn collect_stream<R: Read>(mut stream: R, limit: usize, sink: &Mutex<SharedCapture>) {
    let mut chunk = [0u8; 4096];

    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                let mut shared = lock(sink);
                let remaining = limit.saturating_sub(shared.data.len());
                if n > remaining {
                    shared.data.extend_from_slice(&chunk[..remaining]);
                    shared.integrity = OutputIntegrity::TruncatedByLimit;
                } else {
                    shared.data.extend_from_slice(&chunk[..n]);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(_) => {
                lock(sink).integrity = OutputIntegrity::ReadError;
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_output_limits_default() {
        let limits = OutputLimits::default();
        assert_eq!(limits.stdout_limit, 8 * 1024 * 1024);
        assert_eq!(limits.stderr_limit, 2 * 1024 * 1024);
    }

    #[test]
    fn test_collects_whole_stream_verbatim() {
        let pending = spawn_collector(Cursor::new(b"  line one\n\tline two  ".to_vec()), 1024);
        let captured = pending.finish(Instant::now() + Duration::from_secs(5));
        assert_eq!(captured.integrity, OutputIntegrity::Complete);
        assert_eq!(captured.into_text(), "  line one\n\tline two  ");
    }

    #[test]
    fn test_truncates_at_limit_and_keeps_draining() {
        let data = vec![b'a'; 10_000];
        let pending = spawn_collector(Cursor::new(data), 100);
        let captured = pending.finish(Instant::now() + Duration::from_secs(5));
        assert_eq!(captured.data.len(), 100);
        assert_eq!(captured.integrity, OutputIntegrity::TruncatedByLimit);
    }

    /// Yields `first` once, then blocks until the sender side is dropped
    struct StallingReader {
        first: Option<Vec<u8>>,
        release: crossbeam_channel::Receiver<()>,
    }

    impl Read for StallingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if let Some(first) = self.first.take() {
                buf[..first.len()].copy_from_slice(&first);
                return Ok(first.len());
            }
            let _ = self.release.recv();
            Ok(0)
        }
    }

    #[test]
    fn test_collection_timeout_keeps_bytes_already_read() {
        let (hold, release) = bounded::<()>(0);
        let reader = StallingReader {
            first: Some(b"42".to_vec()),
            release,
        };
        let pending = spawn_collector(reader, 1024);

        // Give the collector time to take the first chunk.
        thread::sleep(Duration::from_millis(100));
        let captured = pending.finish(Instant::now() + Duration::from_millis(200));
        drop(hold);

        assert_eq!(captured.integrity, OutputIntegrity::CollectionTimeout);
        assert_eq!(captured.into_text(), "42");
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let captured = CapturedStream {
            data: vec![b'o', b'k', 0xff],
            integrity: OutputIntegrity::Complete,
        };
        assert_eq!(captured.into_text(), "ok\u{fffd}");
    }

    #[test]
    fn test_output_integrity_display() {
        assert_eq!(format!("{}", OutputIntegrity::Complete), "complete");
        assert_eq!(
            format!("{}", OutputIntegrity::TruncatedByLimit),
            "truncated_by_limit"
        );
        assert_eq!(
            format!("{}", OutputIntegrity::CollectionTimeout),
            "collection_timeout"
        );
    }
}
