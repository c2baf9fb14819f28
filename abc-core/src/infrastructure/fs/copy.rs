// abc-core/src/infrastructure/fs/copy.rs
//
// Visitor-driven recursive copy. The commit phase runs it twice over the
// same tree: a dry run that only detects collisions, then the real pass.

use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use super::{copy_file_preserving_mode, ensure_dir, read_bytes};
use crate::AbcError;
use crate::infrastructure::error::{InfrastructureError, io_ctx};

/// The visitor's verdict for one file about to land on an existing path.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyHint {
    pub overwrite: bool,
    pub backup_if_exists: bool,
}

pub struct CopyParams<'a> {
    pub src_root: &'a Path,
    pub dst_root: &'a Path,
    /// Walk without writing; collisions still surface.
    pub dry_run: bool,
    pub backups: &'a mut BackupDir,
}

/// Copies `src_root` into `dst_root`, calling `visitor` with the relative
/// path of every file. Returns the relative paths copied, in walk order.
///
/// An existing destination file with identical content is left alone. A
/// differing one needs `overwrite` from the visitor, and is backed up
/// first when `backup_if_exists` is set.
pub fn copy_recursive(
    params: &mut CopyParams,
    visitor: &mut dyn FnMut(&str) -> CopyHint,
) -> Result<Vec<String>, AbcError> {
    let mut copied = Vec::new();

    for entry in WalkDir::new(params.src_root)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            InfrastructureError::ConfigError(format!(
                "walking {}: {}",
                params.src_root.display(),
                e
            ))
        })?;
        let path = entry.path();
        if entry.path_is_symlink() {
            return Err(AbcError::UnsafePath(format!(
                "{} is a symlink; symlinks are not supported",
                path.display()
            )));
        }

        let rel = path
            .strip_prefix(params.src_root)
            .map_err(|e| AbcError::InternalError(format!("walk escaped its root: {}", e)))?;
        if rel.as_os_str().is_empty() {
            continue;
        }
        let rel_str = rel.to_string_lossy().to_string();
        let dst = params.dst_root.join(rel);

        if entry.file_type().is_dir() {
            if !params.dry_run {
                ensure_dir(&dst)?;
            }
            continue;
        }

        let hint = visitor(&rel_str);
        if dst.exists() {
            if same_content(path, &dst)? {
                debug!(path = %rel_str, "destination already up to date");
                copied.push(rel_str);
                continue;
            }
            if !hint.overwrite {
                return Err(InfrastructureError::ConfigError(format!(
                    "destination file already exists and would be overwritten: {} (pass --force-overwrite to allow this)",
                    dst.display()
                ))
                .into());
            }
            if hint.backup_if_exists && !params.dry_run {
                let backed_up = params.backups.backup(&dst, &rel_str)?;
                info!(from = %dst.display(), to = %backed_up.display(), "backed up");
            }
        }

        if !params.dry_run {
            copy_file_preserving_mode(path, &dst)?;
        }
        copied.push(rel_str);
    }

    Ok(copied)
}

fn same_content(a: &Path, b: &Path) -> Result<bool, AbcError> {
    Ok(read_bytes(a)? == read_bytes(b)?)
}

/// Per-render backup directory under `$HOME/.abc/backups/<unix-ts>/<random>/`,
/// created lazily on the first would-overwrite event so clean renders leave
/// no trace.
pub struct BackupDir {
    timestamp: i64,
    root: Option<PathBuf>,
}

impl BackupDir {
    pub fn new(timestamp: i64) -> Self {
        Self {
            timestamp,
            root: None,
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    fn ensure(&mut self) -> Result<&Path, AbcError> {
        if self.root.is_none() {
            let home = dirs::home_dir().ok_or_else(|| {
                InfrastructureError::ConfigError(
                    "cannot locate a home directory for backups".to_string(),
                )
            })?;
            let parent = home.join(".abc").join("backups").join(self.timestamp.to_string());
            ensure_dir(&parent)?;
            let dir = tempfile::Builder::new()
                .prefix("")
                .tempdir_in(&parent)
                .map_err(|e| io_ctx("create backup directory", &parent, e))?
                .keep();
            self.root = Some(dir);
        }
        match self.root.as_deref() {
            Some(root) => Ok(root),
            None => Err(AbcError::InternalError(
                "backup directory vanished after creation".to_string(),
            )),
        }
    }

    /// Copies `file` to `<backup root>/<rel>` before it gets overwritten.
    pub fn backup(&mut self, file: &Path, rel: &str) -> Result<PathBuf, AbcError> {
        let dst = self.ensure()?.join(rel);
        copy_file_preserving_mode(file, &dst)?;
        Ok(dst)
    }
}
