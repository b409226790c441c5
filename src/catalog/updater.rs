use crate::catalog::loader::{calculate_hash, save_backup, CatalogSource};
use crate::catalog::service::{fetch_all, PricingService, RefreshReport};
use crate::error::Result;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tracing::{error, info, warn};

/// Periodically re-fetches the catalog sources and republishes the rate card
pub struct PricingUpdater {
    service: Arc<PricingService>,
    sources: Vec<Arc<dyn CatalogSource>>,
    update_interval: Duration,
    backup_dir: Option<PathBuf>,
    cache_path: Option<PathBuf>,
    last_hashes: Mutex<HashMap<String, String>>,
}

impl PricingUpdater {
    pub fn new(
        service: Arc<PricingService>,
        sources: Vec<Arc<dyn CatalogSource>>,
        update_interval: Duration,
    ) -> Self {
        Self {
            service,
            sources,
            update_interval,
            backup_dir: None,
            cache_path: None,
            last_hashes: Mutex::new(HashMap::new()),
        }
    }

    /// Keep a timestamped copy of every changed payload
    pub fn with_backup_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.backup_dir = Some(dir.into());
        self
    }

    /// Write the card cache after each successful refresh
    pub fn with_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = Some(path.into());
        self
    }

    /// Run until `shutdown` flips to true or Ctrl+C is received
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Starting pricing updater (interval: {:?}, sources: {})",
            self.update_interval,
            self.sources.len()
        );

        let mut interval = tokio::time::interval(self.update_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.check_and_update().await {
                        Ok(Some(report)) => info!(
                            entries = report.entries,
                            regions = report.regions,
                            "Rate card updated"
                        ),
                        Ok(None) => info!("Catalogs unchanged (no update needed)"),
                        Err(e) => error!("Pricing update failed: {}", e),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Pricing updater stopping");
                        break;
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl+C, stopping pricing updater");
                    break;
                }
            }
        }
    }

    /// Fetch all sources and refresh when any payload changed
    ///
    /// Returns `None` when every payload hashes to the value recorded at the
    /// last successful refresh.
    pub async fn check_and_update(&self) -> Result<Option<RefreshReport>> {
        let payloads = fetch_all(&self.sources).await?;

        let hashes: HashMap<String, String> = payloads
            .iter()
            .map(|p| (p.source.clone(), calculate_hash(&p.content)))
            .collect();

        {
            let last = self.last_hashes.lock().await;
            if !last.is_empty() && *last == hashes {
                return Ok(None);
            }
        }

        info!("Catalog payloads changed, rebuilding rate card");

        if let Some(dir) = &self.backup_dir {
            let last = self.last_hashes.lock().await;
            for payload in &payloads {
                if last.get(&payload.source) != hashes.get(&payload.source) {
                    save_backup(&payload.content, dir, &payload.source).await?;
                }
            }
        }

        let report = self.service.refresh_payloads(payloads).await?;

        if let Some(path) = &self.cache_path {
            if let Err(e) = self.service.save_cache(path).await {
                warn!("Failed to write rate card cache {}: {}", path.display(), e);
            }
        }

        *self.last_hashes.lock().await = hashes;
        Ok(Some(report))
    }
}
