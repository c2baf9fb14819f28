// abc-core/src/infrastructure/fs/mod.rs

pub mod copy;
pub mod tracker;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::AbcError;
use crate::domain::api::manifest::is_safe_rel_path;
use crate::infrastructure::error::io_ctx;

pub use copy::{BackupDir, CopyHint, CopyParams, copy_recursive};
pub use tracker::DirTracker;

/// Replaces `path` without ever exposing a half-written file: the bytes
/// land in a staging file in the same directory, then a rename swaps it
/// in. The staging file must share the directory or the rename stops
/// being atomic across filesystems.
pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, content: C) -> Result<(), AbcError> {
    let path = path.as_ref();
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut staged = tempfile::Builder::new()
        .prefix(".abc-write-")
        .tempfile_in(dir)
        .map_err(|e| io_ctx("stage a write near", path, e))?;
    staged
        .write_all(content.as_ref())
        .map_err(|e| io_ctx("write", path, e))?;
    staged
        .persist(path)
        .map_err(|e| io_ctx("replace", path, e.error))?;
    Ok(())
}

/// Joins a user-supplied relative path under `base`, rejecting absolute
/// paths and `..` traversal.
pub fn safe_join(base: &Path, rel: &str) -> Result<PathBuf, AbcError> {
    if !is_safe_rel_path(rel) {
        return Err(AbcError::UnsafePath(rel.to_string()));
    }
    Ok(base.join(rel))
}

pub fn read_to_string(path: &Path) -> Result<String, AbcError> {
    fs::read_to_string(path).map_err(|e| io_ctx("read", path, e).into())
}

pub fn read_bytes(path: &Path) -> Result<Vec<u8>, AbcError> {
    fs::read(path).map_err(|e| io_ctx("read", path, e).into())
}

pub fn ensure_dir(path: &Path) -> Result<(), AbcError> {
    fs::create_dir_all(path).map_err(|e| io_ctx("create directory", path, e).into())
}

/// Writes a file, creating parent directories. New files get owner-only
/// permissions unless an explicit mode (e.g. a preserved executable bit)
/// is given.
pub fn write_file(path: &Path, content: &[u8], mode: Option<u32>) -> Result<(), AbcError> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, content).map_err(|e| io_ctx("write", path, e))?;
    set_mode(path, mode.unwrap_or(0o600))?;
    Ok(())
}

/// Copies one file, preserving its permission bits (the executable bit
/// survives).
pub fn copy_file_preserving_mode(src: &Path, dst: &Path) -> Result<(), AbcError> {
    if let Some(parent) = dst.parent() {
        ensure_dir(parent)?;
    }
    // std::fs::copy carries permissions over on unix.
    fs::copy(src, dst).map_err(|e| io_ctx("copy", src, e))?;
    Ok(())
}

/// Reads the unix mode bits of a file. `None` on non-unix hosts.
pub fn file_mode(path: &Path) -> Result<Option<u32>, AbcError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let meta = fs::metadata(path).map_err(|e| io_ctx("stat", path, e))?;
        Ok(Some(meta.permissions().mode() & 0o777))
    }
    #[cfg(not(unix))]
    {
        let _ = path;
        Ok(None)
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<(), AbcError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(|e| io_ctx("chmod", path, e).into())
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<(), AbcError> {
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    #[test]
    fn test_atomic_write_creates_file() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("test.txt");
        atomic_write(&file_path, "Hello, World!")?;
        assert_eq!(fs::read_to_string(&file_path)?, "Hello, World!");
        Ok(())
    }

    #[test]
    fn test_atomic_write_replaces_without_leftovers() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("cfg.yaml");
        atomic_write(&path, "first")?;
        atomic_write(&path, "second")?;
        assert_eq!(fs::read_to_string(&path)?, "second");
        // The staging file is gone once the rename lands.
        assert_eq!(fs::read_dir(dir.path())?.count(), 1);
        Ok(())
    }

    #[test]
    fn test_safe_join_rejects_traversal() {
        let base = Path::new("/base");
        assert!(safe_join(base, "ok/child.txt").is_ok());
        assert!(matches!(
            safe_join(base, "../secret"),
            Err(AbcError::UnsafePath(_))
        ));
        assert!(matches!(
            safe_join(base, "/abs"),
            Err(AbcError::UnsafePath(_))
        ));
    }

    #[test]
    fn test_write_file_creates_parents() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("a/b/c.txt");
        write_file(&path, b"x", None)?;
        assert_eq!(fs::read_to_string(&path)?, "x");
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_preserves_executable_bit() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let src = dir.path().join("run.sh");
        fs::write(&src, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&src, fs::Permissions::from_mode(0o755)).unwrap();

        let dst = dir.path().join("out/run.sh");
        copy_file_preserving_mode(&src, &dst).unwrap();
        assert_eq!(file_mode(&dst).unwrap(), Some(0o755));
    }
}
