//! `mgc update` – fast-forward already cloned repositories.

use anyhow::Result;
use mgc_core::config::MgcConfig;
use mgc_core::control::CancelToken;
use mgc_core::error::PreconditionError;
use mgc_core::git::GitCli;
use mgc_core::repository::FilterType;
use mgc_core::scheduler::{Manager, ManagerSettings};
use tokio::sync::mpsc;

use crate::cli::progress_view::{render_update_report, ProgressView, ViewStyle};
use crate::cli::{signal, SelectArgs};

pub async fn run_update(
    cfg: &MgcConfig,
    account: &str,
    filter: FilterType,
    select: &SelectArgs,
) -> Result<()> {
    let repos = super::fetch_repositories(cfg, account).await?;
    let candidates = super::apply_filter(&repos, filter);
    if !select.all && select.select.is_none() {
        println!();
        super::print_listing(&candidates);
    }
    let chosen = super::choose_repositories(&candidates, select).await?;
    if chosen.is_empty() {
        return Err(PreconditionError::NothingSelected.into());
    }

    let mut manager = Manager::new(GitCli::default(), ManagerSettings::from_config(cfg));
    let cancel = CancelToken::new();
    let signals = signal::spawn_cancel_on_signal(cancel.clone());
    let (progress_tx, progress_rx) = mpsc::channel(64);
    let view = tokio::spawn(ProgressView::stdout(ViewStyle::for_stdout()).run(progress_rx, cancel.clone()));

    let outcome = manager
        .update_repositories(account, chosen, &cancel, Some(&progress_tx))
        .await;
    drop(progress_tx);
    let _ = view.await;
    signals.abort();

    let report = outcome?;
    println!();
    for line in render_update_report(&report) {
        println!("{}", line);
    }
    Ok(())
}
