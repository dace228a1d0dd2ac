//! CLI for the MGC mass repository cloner.

mod commands;
mod progress_view;
mod selection;
mod signal;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use mgc_core::config::{self, MgcConfig};
use mgc_core::repository::FilterType;

use commands::{run_clone, run_list, run_update};

/// Top-level CLI for the MGC mass repository cloner.
#[derive(Debug, Parser)]
#[command(name = "mgc")]
#[command(about = "MGC: clone many repositories of an account concurrently", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Show repository statistics and a numbered listing for an account.
    List {
        /// User or organization name.
        account: String,
        /// Which repositories to show.
        #[arg(long, value_enum, default_value_t = FilterArg::All)]
        filter: FilterArg,
    },

    /// Clone the selected repositories of an account.
    Clone {
        /// User or organization name.
        account: String,
        /// Which repositories to offer for selection.
        #[arg(long, value_enum, default_value_t = FilterArg::All)]
        filter: FilterArg,
        #[command(flatten)]
        select: SelectArgs,
        #[command(flatten)]
        run: RunArgs,
        /// Maximum number of clone rounds (including the first).
        #[arg(long, value_name = "N")]
        retries: Option<u32>,
    },

    /// Fast-forward already cloned repositories of an account.
    Update {
        /// User or organization name.
        account: String,
        /// Which repositories to offer for selection.
        #[arg(long, value_enum, default_value_t = FilterArg::All)]
        filter: FilterArg,
        #[command(flatten)]
        select: SelectArgs,
        #[command(flatten)]
        run: RunArgs,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FilterArg {
    All,
    NonForks,
    Forks,
}

impl From<FilterArg> for FilterType {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::All => FilterType::All,
            FilterArg::NonForks => FilterType::NonForks,
            FilterArg::Forks => FilterType::ForksOnly,
        }
    }
}

/// How repositories are picked. Without either flag the selection is prompted on stdin.
#[derive(Debug, Clone, Args)]
pub struct SelectArgs {
    /// Selection expression, e.g. `1-3,7` or `all`.
    #[arg(long, value_name = "EXPR", conflicts_with = "all")]
    pub select: Option<String>,
    /// Select every listed repository.
    #[arg(long)]
    pub all: bool,
}

/// Overrides for the config file and environment.
#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Number of concurrent clones.
    #[arg(long, value_name = "N")]
    pub jobs: Option<usize>,
    /// Per-repository timeout, e.g. `90s`, `10m`.
    #[arg(long, value_name = "DUR", value_parser = parse_timeout)]
    pub timeout: Option<Duration>,
    /// Base directory; repositories land in `<base-dir>/<account>/`.
    #[arg(long, value_name = "PATH")]
    pub base_dir: Option<PathBuf>,
}

impl RunArgs {
    pub fn apply(&self, cfg: &mut MgcConfig) {
        if let Some(jobs) = self.jobs {
            cfg.max_concurrency = jobs;
        }
        if let Some(timeout) = self.timeout {
            cfg.clone_timeout_secs = timeout.as_secs().max(1);
        }
        if let Some(dir) = &self.base_dir {
            cfg.base_dir = dir.clone();
        }
    }
}

fn parse_timeout(s: &str) -> Result<Duration, String> {
    config::parse_duration(s).ok_or_else(|| format!("invalid duration: {s}"))
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let mut cfg = config::load_or_init()?;

        match &cli.command {
            CliCommand::Clone { run, retries, .. } => {
                run.apply(&mut cfg);
                if let Some(n) = retries {
                    cfg.retry_attempts = *n;
                }
            }
            CliCommand::Update { run, .. } => run.apply(&mut cfg),
            CliCommand::List { .. } => {}
        }
        cfg.validate()?;
        tracing::debug!(
            max_concurrency = cfg.max_concurrency,
            clone_timeout_secs = cfg.clone_timeout_secs,
            retry_attempts = cfg.retry_attempts,
            base_dir = %cfg.base_dir.display(),
            token = cfg.token.is_some(),
            "effective config"
        );

        match cli.command {
            CliCommand::List { account, filter } => run_list(&cfg, &account, filter.into()).await?,
            CliCommand::Clone {
                account,
                filter,
                select,
                ..
            } => run_clone(&cfg, &account, filter.into(), &select).await?,
            CliCommand::Update {
                account,
                filter,
                select,
                ..
            } => run_update(&cfg, &account, filter.into(), &select).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
