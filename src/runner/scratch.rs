//! Per-firing scratch directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{error, info, warn};

use crate::error::{BenchError, Result};

const MAX_NAME_ATTEMPTS: u32 = 16;

/// A freshly created directory owned by exactly one firing.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Create `{root}/temp_io_files_{unix_seconds}_{server_id}`.
    ///
    /// An existing directory is never reused: a firing that starts in the same
    /// second as another gets a `_2`, `_3`, ... suffix.
    pub fn create(root: &Path, server_id: &str) -> Result<Self> {
        let base = format!("temp_io_files_{}_{}", Utc::now().timestamp(), server_id);

        std::fs::create_dir_all(root).map_err(|source| BenchError::ScratchDir {
            path: root.join(&base),
            source,
        })?;

        let mut attempt = 1;
        loop {
            let name = if attempt == 1 {
                base.clone()
            } else {
                format!("{}_{}", base, attempt)
            };
            let path = root.join(name);
            match std::fs::create_dir(&path) {
                Ok(()) => {
                    info!(path = %path.display(), "Created temp directory");
                    return Ok(Self { path });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists && attempt < MAX_NAME_ATTEMPTS => {
                    attempt += 1;
                }
                Err(source) => return Err(BenchError::ScratchDir { path, source }),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete every file, then the directory. Failures are logged, not raised.
    /// Returns whether the directory is gone.
    pub fn cleanup(self) -> bool {
        let entries = match std::fs::read_dir(&self.path) {
            Ok(entries) => entries,
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "Failed to delete temp directory");
                return false;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "Failed to list temp directory entry");
                    continue;
                }
            };
            let file = entry.path();
            if let Err(e) = std::fs::remove_file(&file) {
                warn!(path = %file.display(), error = %e, "Failed to delete temp file");
            }
        }

        match std::fs::remove_dir(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "Deleted temp directory");
                true
            }
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "Failed to delete temp directory");
                false
            }
        }
    }
}
