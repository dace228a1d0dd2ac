use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::CloneError;
use crate::repository::Repository;

use super::{local, CloneTool};

/// Runs exactly one clone or update attempt per call, bounded by `timeout`.
///
/// A failed or timed-out clone leaves the target directory as it was before
/// the call: whatever the tool created at the destination is removed.
#[derive(Debug)]
pub struct CloneExecutor<T> {
    tool: T,
    timeout: Duration,
}

impl<T: CloneTool> CloneExecutor<T> {
    pub fn new(tool: T, timeout: Duration) -> Self {
        Self { tool, timeout }
    }

    pub fn tool(&self) -> &T {
        &self.tool
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Clone `repo` into `<target_dir>/<repo dir name>` and return that path.
    pub async fn clone_into(
        &self,
        repo: &Repository,
        target_dir: &Path,
    ) -> Result<PathBuf, CloneError> {
        let dest = target_dir.join(repo.dir_name());

        match tokio::fs::symlink_metadata(&dest).await {
            Ok(_) => return Err(CloneError::AlreadyExists { path: dest }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(CloneError::Io {
                    path: dest,
                    source: e,
                })
            }
        }

        let outcome = tokio::time::timeout(
            self.timeout,
            self.tool.clone_repo(&repo.clone_url, &dest),
        )
        .await;

        let err = match outcome {
            Ok(Ok(())) => {
                tracing::debug!(repo = %repo.name, path = %dest.display(), "clone finished");
                return Ok(dest);
            }
            Ok(Err(source)) => CloneError::Execution { source },
            Err(_) => CloneError::TimedOut {
                after: self.timeout,
            },
        };
        tracing::warn!(repo = %repo.name, "clone failed: {}", err);
        remove_partial(&dest).await;
        Err(err)
    }

    /// Fast-forward `repo_path` if it is an existing git repository.
    pub async fn update(&self, repo_path: &Path) -> Result<(), CloneError> {
        if !local::probe(repo_path).await.is_valid_clone() {
            return Err(CloneError::NotARepository {
                path: repo_path.to_path_buf(),
            });
        }

        match tokio::time::timeout(self.timeout, self.tool.pull_ff_only(repo_path)).await {
            Ok(Ok(())) => {
                tracing::debug!(path = %repo_path.display(), "update finished");
                Ok(())
            }
            Ok(Err(source)) => Err(CloneError::Execution { source }),
            Err(_) => Err(CloneError::TimedOut {
                after: self.timeout,
            }),
        }
    }
}

/// Best-effort removal of a partial clone. Failures are logged, not returned.
async fn remove_partial(dest: &Path) {
    match tokio::fs::remove_dir_all(dest).await {
        Ok(()) => tracing::debug!(path = %dest.display(), "removed partial clone"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %dest.display(), "could not remove partial clone: {}", e)
        }
    }
}
