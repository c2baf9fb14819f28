// abc-core/src/infrastructure/hash.rs

use sha2::{Digest, Sha256};
use std::ffi::OsStr;
use std::path::Path;
use walkdir::WalkDir;

use crate::AbcError;
use crate::infrastructure::fs::read_bytes;

const HASH_PREFIX: &str = "h1:";

/// Content hash of one file: `h1:<hex sha256>`.
pub fn file_hash(path: &Path) -> Result<String, AbcError> {
    let bytes = read_bytes(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(format!("{}{}", HASH_PREFIX, hex::encode(digest)))
}

/// Deterministic hash of a directory tree: relative paths and contents,
/// walked in sorted order. `.git` subtrees are ignored so the hash is
/// stable across clones.
pub fn dir_hash(root: &Path) -> Result<String, AbcError> {
    let mut hasher = Sha256::new();
    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.file_name() != OsStr::new(".git"))
    {
        let entry =
            entry.map_err(|e| AbcError::InternalError(format!("walking {}: {}", root.display(), e)))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| AbcError::InternalError(e.to_string()))?;
        hasher.update(rel.to_string_lossy().as_bytes());
        hasher.update([0u8]);
        hasher.update(read_bytes(entry.path())?);
        hasher.update([0u8]);
    }
    Ok(format!("{}{}", HASH_PREFIX, hex::encode(hasher.finalize())))
}
