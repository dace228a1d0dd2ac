//! CLI command handlers. Each command is in its own file.

mod clone;
mod list;
mod update;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use mgc_core::config::MgcConfig;
use mgc_core::github::GithubClient;
use mgc_core::repository::{calculate_stats, filter_repositories, FilterType, Repository};

use super::{selection, SelectArgs};

pub use clone::run_clone;
pub use list::run_list;
pub use update::run_update;

/// Check the account and list its repositories, off the async runtime.
async fn fetch_repositories(cfg: &MgcConfig, account: &str) -> Result<Vec<Arc<Repository>>> {
    let client = GithubClient::from_config(cfg).context("invalid API configuration")?;
    let account = account.to_string();
    let repos = tokio::task::spawn_blocking(move || -> Result<Vec<Repository>> {
        let exists = client
            .account_exists(&account)
            .with_context(|| format!("failed to look up account {}", account))?;
        if !exists {
            bail!("account '{}' not found", account);
        }
        client
            .list_repositories(&account)
            .with_context(|| format!("failed to list repositories of {}", account))
    })
    .await
    .context("listing task join")??;
    Ok(repos.into_iter().map(Arc::new).collect())
}

/// Resolve the selection on the blocking pool; the prompt reads stdin.
async fn choose_repositories(
    candidates: &[Arc<Repository>],
    select: &SelectArgs,
) -> Result<Vec<Arc<Repository>>> {
    let candidates = candidates.to_vec();
    let select = select.clone();
    tokio::task::spawn_blocking(move || selection::choose(&candidates, &select))
        .await
        .context("selection task join")?
}

/// Print statistics and return the repositories matching `filter`.
fn apply_filter(repos: &[Arc<Repository>], filter: FilterType) -> Vec<Arc<Repository>> {
    let stats = calculate_stats(repos);
    println!("Repository statistics");
    println!("  Total:     {}", stats.total);
    println!("  Non-forks: {}", stats.non_forks);
    println!("  Forks:     {}", stats.forks);
    println!("  Public:    {}", stats.public);
    println!("  Private:   {}", stats.private);
    let kept = filter_repositories(repos, filter);
    println!("{}: {}", filter.label(), kept.len());
    kept
}

/// One numbered line per repository, 1-based as used by `--select`.
fn print_listing(repos: &[Arc<Repository>]) {
    let width = repos.len().to_string().len();
    for (i, repo) in repos.iter().enumerate() {
        let mut tags = Vec::new();
        if repo.is_fork {
            tags.push("fork");
        }
        if repo.is_private {
            tags.push("private");
        }
        let tags = if tags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", tags.join(", "))
        };
        let language = repo.language.as_deref().unwrap_or("-");
        println!(
            "{:>width$}. {}{}  ({}, ★ {})",
            i + 1,
            repo.name,
            tags,
            language,
            repo.star_count,
            width = width
        );
        if let Some(desc) = repo.description.as_deref().filter(|d| !d.is_empty()) {
            println!("{:>width$}  {}", "", desc, width = width);
        }
    }
}
