// abc-core/src/ports/downloader.rs

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::AbcError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GitProtocol {
    #[default]
    Https,
    Ssh,
}

impl fmt::Display for GitProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GitProtocol::Https => write!(f, "https"),
            GitProtocol::Ssh => write!(f, "ssh"),
        }
    }
}

impl FromStr for GitProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "https" => Ok(GitProtocol::Https),
            "ssh" => Ok(GitProtocol::Ssh),
            other => Err(format!(
                "invalid git protocol {:?}; valid choices are https, ssh",
                other
            )),
        }
    }
}

pub struct DownloadRequest<'a> {
    pub cwd: &'a Path,
    pub source: &'a str,
    pub git_protocol: GitProtocol,
    /// Caller-supplied directory the template lands in.
    pub dest: &'a Path,
}

/// What the downloader learned about the template while materializing it.
#[derive(Debug, Clone, Default)]
pub struct DownloadMeta {
    /// E.g. "local_git", "local_dir".
    pub location_type: String,
    /// Canonical form of the source for the manifest.
    pub canonical_source: String,
    /// Template version (a git tag or short sha), when known.
    pub version: String,
}

/// Materializes a template source into a local directory. The render
/// driver calls this exactly once per render.
pub trait Downloader {
    fn download(&self, req: &DownloadRequest<'_>) -> Result<DownloadMeta, AbcError>;
}
