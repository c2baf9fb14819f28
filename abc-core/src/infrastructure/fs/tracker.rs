// abc-core/src/infrastructure/fs/tracker.rs

use std::path::PathBuf;
use tempfile::TempDir;
use tracing::info;

use crate::AbcError;
use crate::infrastructure::error::InfrastructureError;

/// Tracks every temp directory a render creates (template copy, scratch,
/// golden sandboxes) so they all disappear on any exit path. With
/// `keep = true` the directories are detached immediately and survive for
/// debugging; their paths are logged.
pub struct DirTracker {
    keep: bool,
    live: Vec<TempDir>,
    kept: Vec<PathBuf>,
}

impl DirTracker {
    pub fn new(keep: bool) -> Self {
        Self {
            keep,
            live: Vec::new(),
            kept: Vec::new(),
        }
    }

    /// Creates and tracks a fresh owner-only temp directory.
    pub fn track(&mut self, prefix: &str) -> Result<PathBuf, AbcError> {
        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir()
            .map_err(InfrastructureError::Io)?;
        if self.keep {
            let path = dir.keep();
            info!(path = %path.display(), "keeping temp dir");
            self.kept.push(path.clone());
            Ok(path)
        } else {
            let path = dir.path().to_path_buf();
            self.live.push(dir);
            Ok(path)
        }
    }

    pub fn kept_dirs(&self) -> &[PathBuf] {
        &self.kept
    }
}

// Dropping the tracker removes every live directory (TempDir's Drop).
