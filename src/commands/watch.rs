use anyhow::Result;
use colored::Colorize;
use ratecard::catalog::{build_sources, PricingService, PricingUpdater};
use ratecard::config::Config;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::warn;

/// Execute the watch command
///
/// Runs the updater in the foreground until Ctrl+C.
pub async fn execute(cfg: &Config, interval: Option<u64>) -> Result<()> {
    let interval = interval.unwrap_or(cfg.refresh.interval_seconds);
    if interval == 0 {
        anyhow::bail!("Refresh interval must be greater than 0");
    }

    let service = Arc::new(PricingService::new(cfg.to_region_policy()?));
    if let Some(path) = &cfg.cache.path {
        if let Err(e) = service.load_cache(path).await {
            warn!("Ignoring rate card cache: {}", e);
        }
    }

    let mut updater = PricingUpdater::new(
        service,
        build_sources(&cfg.catalogs)?,
        Duration::from_secs(interval),
    );
    if let Some(dir) = &cfg.refresh.backup_dir {
        updater = updater.with_backup_dir(dir);
    }
    if let Some(path) = &cfg.cache.path {
        updater = updater.with_cache_path(path);
    }

    println!(
        "{}",
        format!("Watching {} catalogs every {}s (Ctrl+C to stop)", cfg.catalogs.len(), interval)
            .green()
    );

    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    Arc::new(updater).run(shutdown_rx).await;
    Ok(())
}
