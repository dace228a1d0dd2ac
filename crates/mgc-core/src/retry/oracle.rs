//! Filesystem oracle for retry eligibility.
//!
//! The in-memory `CloneResult` of a round is deliberately not consulted: a
//! repository counts as done exactly when its directory exists and carries
//! git metadata, whatever the last result said.

use std::path::Path;
use std::sync::Arc;

use crate::git;
use crate::repository::Repository;

/// Repositories of `submitted` without a valid clone under `target_dir`, in input order.
pub async fn still_failed(
    submitted: &[Arc<Repository>],
    target_dir: &Path,
) -> Vec<Arc<Repository>> {
    let mut failed = Vec::new();
    for repo in submitted {
        let info = git::probe(&target_dir.join(repo.dir_name())).await;
        if !info.is_valid_clone() {
            tracing::debug!(
                repo = %repo.name,
                exists = info.exists,
                is_git_repo = info.is_git_repo,
                "still needs a clone"
            );
            failed.push(Arc::clone(repo));
        }
    }
    failed
}
