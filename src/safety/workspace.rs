/// Request-scoped work areas
///
/// Each request gets a private UUID-named directory. It is removed when the
/// request ends, whichever way it ends.
use crate::config::types::{ExecError, Result};
use std::fs::{self, DirBuilder};
use std::io;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use uuid::Uuid;

/// Directory name prefix shared by every work area
pub const WORK_AREA_PREFIX: &str = "cpp-execution-";

/// Exclusively-owned directory for one request's source and artifact
#[derive(Debug)]
pub struct WorkArea {
    id: String,
    dir: PathBuf,
    released: bool,
}

impl WorkArea {
    /// Create a fresh work area under `base_dir`
    pub fn create(base_dir: &Path) -> Result<Self> {
        let id = Uuid::new_v4().to_string();
        let dir = base_dir.join(format!("{}{}", WORK_AREA_PREFIX, id));

        // create_dir on the leaf fails if the name already exists, so two areas
        // can never share a directory.
        DirBuilder::new()
            .mode(0o700)
            .create(&dir)
            .map_err(|e| {
                ExecError::Workspace(format!(
                    "Failed to create work area {}: {}",
                    dir.display(),
                    e
                ))
            })?;

        log::debug!("Created work area {}", dir.display());
        Ok(Self {
            id,
            dir,
            released: false,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `content` verbatim to `name` inside the area
    pub fn write_source(&self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.dir.join(name);
        fs::write(&path, content).map_err(|e| {
            ExecError::Workspace(format!(
                "Failed to write source file {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(path)
    }

    /// Path the artifact will be written to; nothing is created
    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Remove the area now and report failure. Drop does the same silently.
    pub fn close(mut self) -> Result<()> {
        self.released = true;
        remove_area(&self.dir).map_err(|e| {
            ExecError::Workspace(format!(
                "Failed to remove work area {}: {}",
                self.dir.display(),
                e
            ))
        })
    }
}

impl Drop for WorkArea {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = remove_area(&self.dir) {
            log::warn!("Failed to remove work area {}: {}", self.dir.display(), e);
        }
    }
}

fn remove_area(dir: &Path) -> io::Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Owner of the base directory all work areas live in
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    base_dir: PathBuf,
}

impl WorkspaceManager {
    /// Create new workspace manager, creating the base directory if needed
    pub fn new(base_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_dir).map_err(|e| {
            ExecError::Workspace(format!(
                "Failed to create workspace base directory {}: {}",
                base_dir.display(),
                e
            ))
        })?;

        // Children run with the work area as cwd, so paths handed to them
        // must not be relative.
        let base_dir = fs::canonicalize(&base_dir).map_err(|e| {
            ExecError::Workspace(format!(
                "Failed to resolve workspace base directory {}: {}",
                base_dir.display(),
                e
            ))
        })?;

        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn create_work_area(&self) -> Result<WorkArea> {
        WorkArea::create(&self.base_dir)
    }

    /// Remove work areas older than `max_age` left behind by a crashed process
    pub fn sweep_stale(&self, max_age: Duration) -> Result<usize> {
        let mut cleaned = 0;
        let now = SystemTime::now();

        let entries = fs::read_dir(&self.base_dir).map_err(|e| {
            ExecError::Workspace(format!(
                "Failed to read workspace directory {}: {}",
                self.base_dir.display(),
                e
            ))
        })?;

        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    log::warn!("Failed to read directory entry: {}", e);
                    continue;
                }
            };

            let path = entry.path();
            let is_work_area = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(WORK_AREA_PREFIX));
            if !is_work_area || !path.is_dir() {
                continue;
            }

            let modified = match entry.metadata().and_then(|m| m.modified()) {
                Ok(m) => m,
                Err(e) => {
                    log::warn!("Failed to get modified time for {}: {}", path.display(), e);
                    continue;
                }
            };

            let age = match now.duration_since(modified) {
                Ok(d) => d,
                Err(_) => continue,
            };

            if age >= max_age {
                log::info!("Removing stale work area {}", path.display());
                match remove_area(&path) {
                    Ok(()) => cleaned += 1,
                    Err(e) => log::warn!("Failed to remove {}: {}", path.display(), e),
                }
            }
        }

        Ok(cleaned)
    }
}
