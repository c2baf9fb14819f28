// abc-core/src/infrastructure/adapters/downloader.rs
//
// Local-directory downloader. Remote protocols (git, GitHub, tarballs)
// live behind the same trait in their own adapters; the engine only ever
// sees a materialized directory.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

use crate::AbcError;
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::fs as afs;
use crate::infrastructure::git;
use crate::ports::{DownloadMeta, DownloadRequest, Downloader};

pub struct LocalDownloader;

impl Downloader for LocalDownloader {
    fn download(&self, req: &DownloadRequest<'_>) -> Result<DownloadMeta, AbcError> {
        let source = resolve(req.cwd, req.source);
        if !source.is_dir() {
            return Err(InfrastructureError::ConfigError(format!(
                "template source {:?} is not a directory",
                req.source
            ))
            .into());
        }

        info!(source = %source.display(), "copying template");
        copy_template_tree(&source, req.dest)?;

        let vars = git::git_vars(&source);
        Ok(DownloadMeta {
            location_type: if vars.sha.is_some() {
                "local_git".to_string()
            } else {
                "local_dir".to_string()
            },
            canonical_source: source.display().to_string(),
            version: vars.tag.or(vars.short_sha).unwrap_or_default(),
        })
    }
}

fn resolve(cwd: &Path, source: &str) -> PathBuf {
    let path = Path::new(source);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// Copies the template tree, leaving `.git` behind: the engine hashes and
/// renders template content, not repository plumbing.
fn copy_template_tree(src: &Path, dst: &Path) -> Result<(), AbcError> {
    for entry in WalkDir::new(src)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.file_name() != OsStr::new(".git"))
    {
        let entry = entry.map_err(|e| {
            InfrastructureError::ConfigError(format!("walking {}: {}", src.display(), e))
        })?;
        if entry.path_is_symlink() {
            return Err(AbcError::UnsafePath(format!(
                "{} is a symlink; symlinks are not supported in templates",
                entry.path().display()
            )));
        }
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| AbcError::InternalError(e.to_string()))?;
        if rel.as_os_str().is_empty() {
            continue;
        }
        let dst_path = dst.join(rel);
        if entry.file_type().is_dir() {
            afs::ensure_dir(&dst_path)?;
        } else {
            afs::copy_file_preserving_mode(entry.path(), &dst_path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ports::GitProtocol;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_download_copies_tree_without_git_dir() {
        let src = tempdir().unwrap();
        fs::write(src.path().join("spec.yaml"), "x").unwrap();
        fs::create_dir_all(src.path().join(".git")).unwrap();
        fs::write(src.path().join(".git/HEAD"), "ref").unwrap();
        fs::create_dir_all(src.path().join("sub")).unwrap();
        fs::write(src.path().join("sub/a.txt"), "A").unwrap();

        let dst = tempdir().unwrap();
        let meta = LocalDownloader
            .download(&DownloadRequest {
                cwd: src.path(),
                source: ".",
                git_protocol: GitProtocol::Https,
                dest: dst.path(),
            })
            .unwrap();

        assert_eq!(meta.location_type, "local_dir");
        assert!(dst.path().join("spec.yaml").is_file());
        assert!(dst.path().join("sub/a.txt").is_file());
        assert!(!dst.path().join(".git").exists());
    }

    #[test]
    fn test_download_rejects_missing_source() {
        let cwd = tempdir().unwrap();
        let dst = tempdir().unwrap();
        let err = LocalDownloader
            .download(&DownloadRequest {
                cwd: cwd.path(),
                source: "no-such-dir",
                git_protocol: GitProtocol::Https,
                dest: dst.path(),
            })
            .unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }
}
