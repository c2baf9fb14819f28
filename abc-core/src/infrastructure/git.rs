// abc-core/src/infrastructure/git.rs
//
// Host-git plumbing: the `_git_*` builtin values, the "is this a git
// workspace" check, and the throwaway repo behind --debug-step-diffs.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::AbcError;
use crate::infrastructure::exec::{self, DEFAULT_TIMEOUT};
use crate::infrastructure::fs as afs;

/// Detection of git metadata in a directory. Values are `None` outside a
/// repo (or when the repo has no tag).
#[derive(Debug, Clone, Default)]
pub struct GitVars {
    pub tag: Option<String>,
    pub sha: Option<String>,
    pub short_sha: Option<String>,
}

fn git_output(dir: &Path, args: &[&str]) -> Option<String> {
    let mut argv = vec!["git", "-C"];
    let dir_str = dir.to_str()?;
    argv.push(dir_str);
    argv.extend_from_slice(args);
    match exec::run(&argv, None, Duration::from_secs(10)) {
        Ok(result) if result.code == 0 => {
            let out = result.stdout.trim().to_string();
            (!out.is_empty()).then_some(out)
        }
        _ => None,
    }
}

pub fn git_vars(dir: &Path) -> GitVars {
    GitVars {
        tag: git_output(dir, &["describe", "--tags", "--abbrev=0"]),
        sha: git_output(dir, &["rev-parse", "HEAD"]),
        short_sha: git_output(dir, &["rev-parse", "--short", "HEAD"]),
    }
}

/// True when `dir` (or an ancestor) is a git workspace.
pub fn in_git_workspace(dir: &Path) -> bool {
    git_output(dir, &["rev-parse", "--git-dir"]).is_some()
}

/// Throwaway repository that commits the scratch tree after every step so
/// the per-step diffs can be logged (--debug-step-diffs).
pub struct StepDiffer {
    repo_dir: PathBuf,
    commits: usize,
}

impl StepDiffer {
    pub fn new(repo_dir: PathBuf) -> Result<Self, AbcError> {
        exec::run_ok(&["git", "init", "-q"], Some(&repo_dir), DEFAULT_TIMEOUT)?;
        exec::run_ok(
            &["git", "config", "user.email", "abc@localhost"],
            Some(&repo_dir),
            DEFAULT_TIMEOUT,
        )?;
        exec::run_ok(
            &["git", "config", "user.name", "abc"],
            Some(&repo_dir),
            DEFAULT_TIMEOUT,
        )?;
        Ok(Self {
            repo_dir,
            commits: 0,
        })
    }

    /// Mirrors the scratch tree into the repo, commits, and returns the
    /// diff against the previous step's commit.
    pub fn snapshot(&mut self, scratch: &Path, label: &str) -> Result<String, AbcError> {
        self.mirror(scratch)?;
        exec::run_ok(&["git", "add", "-A"], Some(&self.repo_dir), DEFAULT_TIMEOUT)?;

        let diff = exec::run(
            &["git", "diff", "--cached"],
            Some(&self.repo_dir),
            DEFAULT_TIMEOUT,
        )?
        .stdout;

        exec::run_ok(
            &["git", "commit", "-q", "--allow-empty", "-m", label],
            Some(&self.repo_dir),
            DEFAULT_TIMEOUT,
        )?;
        self.commits += 1;
        debug!(step = label, commits = self.commits, "step snapshot committed");
        Ok(diff)
    }

    fn mirror(&self, scratch: &Path) -> Result<(), AbcError> {
        // Clear the worktree (except .git), then copy scratch over.
        for entry in std::fs::read_dir(&self.repo_dir).map_err(AbcError::from)? {
            let entry = entry.map_err(AbcError::from)?;
            if entry.file_name() == ".git" {
                continue;
            }
            let path = entry.path();
            if path.is_dir() {
                std::fs::remove_dir_all(&path).map_err(AbcError::from)?;
            } else {
                std::fs::remove_file(&path).map_err(AbcError::from)?;
            }
        }
        for entry in walkdir::WalkDir::new(scratch).follow_links(false) {
            let entry = entry
                .map_err(|e| AbcError::InternalError(format!("walking scratch: {}", e)))?;
            let rel = entry
                .path()
                .strip_prefix(scratch)
                .map_err(|e| AbcError::InternalError(e.to_string()))?;
            if rel.as_os_str().is_empty() {
                continue;
            }
            let dst = self.repo_dir.join(rel);
            if entry.file_type().is_dir() {
                afs::ensure_dir(&dst)?;
            } else {
                afs::copy_file_preserving_mode(entry.path(), &dst)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_git_vars_outside_repo() {
        let dir = tempdir().unwrap();
        let vars = git_vars(dir.path());
        assert!(vars.sha.is_none());
        assert!(!in_git_workspace(dir.path()));
    }

    #[test]
    fn test_step_differ_reports_changes() {
        let repo = tempdir().unwrap();
        let scratch = tempdir().unwrap();

        let mut differ = StepDiffer::new(repo.path().to_path_buf()).unwrap();
        std::fs::write(scratch.path().join("a.txt"), "one\n").unwrap();
        let first = differ.snapshot(scratch.path(), "step 1").unwrap();
        assert!(first.contains("+one"));

        std::fs::write(scratch.path().join("a.txt"), "two\n").unwrap();
        let second = differ.snapshot(scratch.path(), "step 2").unwrap();
        assert!(second.contains("-one"));
        assert!(second.contains("+two"));
    }
}
