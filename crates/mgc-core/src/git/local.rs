//! Probe of a repository directory on disk.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Name of the metadata entry that marks a directory as a git repository.
pub const GIT_DIR: &str = ".git";

/// Read-only snapshot of a local clone. Recomputed on demand, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRepoInfo {
    pub path: PathBuf,
    pub exists: bool,
    pub is_git_repo: bool,
    pub last_modified: Option<SystemTime>,
}

impl LocalRepoInfo {
    /// A finished clone: the directory exists and carries git metadata.
    pub fn is_valid_clone(&self) -> bool {
        self.exists && self.is_git_repo
    }
}

/// Inspect `path`. Missing paths and non-directories report `exists == false`.
pub async fn probe(path: &Path) -> LocalRepoInfo {
    let mut info = LocalRepoInfo {
        path: path.to_path_buf(),
        exists: false,
        is_git_repo: false,
        last_modified: None,
    };

    let meta = match tokio::fs::metadata(path).await {
        Ok(m) if m.is_dir() => m,
        _ => return info,
    };
    info.exists = true;
    info.last_modified = meta.modified().ok();
    // `.git` may be a file for worktrees and submodules.
    info.is_git_repo = tokio::fs::symlink_metadata(path.join(GIT_DIR)).await.is_ok();
    info
}
