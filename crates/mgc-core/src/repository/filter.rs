//! Fork filtering and account statistics.

use super::Repository;

/// Which repositories to offer for selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterType {
    #[default]
    All,
    NonForks,
    ForksOnly,
}

impl FilterType {
    pub fn label(self) -> &'static str {
        match self {
            FilterType::All => "All repositories",
            FilterType::NonForks => "Non-fork repositories only",
            FilterType::ForksOnly => "Fork repositories only",
        }
    }

    pub fn matches(self, repo: &Repository) -> bool {
        match self {
            FilterType::All => true,
            FilterType::NonForks => !repo.is_fork,
            FilterType::ForksOnly => repo.is_fork,
        }
    }
}

/// Counts shown before the user picks a filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepositoryStats {
    pub total: usize,
    pub forks: usize,
    pub non_forks: usize,
    pub private: usize,
    pub public: usize,
}

impl RepositoryStats {
    /// Number of repositories a filter would keep.
    pub fn count_for(&self, filter: FilterType) -> usize {
        match filter {
            FilterType::All => self.total,
            FilterType::NonForks => self.non_forks,
            FilterType::ForksOnly => self.forks,
        }
    }
}

/// Keep the repositories matching `filter`, preserving order.
pub fn filter_repositories<R>(repos: &[R], filter: FilterType) -> Vec<R>
where
    R: AsRef<Repository> + Clone,
{
    repos
        .iter()
        .filter(|r| filter.matches(r.as_ref()))
        .cloned()
        .collect()
}

pub fn calculate_stats<R: AsRef<Repository>>(repos: &[R]) -> RepositoryStats {
    let mut stats = RepositoryStats {
        total: repos.len(),
        ..RepositoryStats::default()
    };
    for repo in repos.iter().map(AsRef::as_ref) {
        if repo.is_fork {
            stats.forks += 1;
        } else {
            stats.non_forks += 1;
        }
        if repo.is_private {
            stats.private += 1;
        } else {
            stats.public += 1;
        }
    }
    stats
}

impl AsRef<Repository> for Repository {
    fn as_ref(&self) -> &Repository {
        self
    }
}
