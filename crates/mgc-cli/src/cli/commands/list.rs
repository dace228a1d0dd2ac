//! `mgc list` – statistics and numbered listing.

use anyhow::Result;
use mgc_core::config::MgcConfig;
use mgc_core::repository::FilterType;

pub async fn run_list(cfg: &MgcConfig, account: &str, filter: FilterType) -> Result<()> {
    let repos = super::fetch_repositories(cfg, account).await?;
    let kept = super::apply_filter(&repos, filter);
    println!();
    super::print_listing(&kept);
    Ok(())
}
