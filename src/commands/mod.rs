//! Command implementations for the CLI
//!
//! - check: ingest every catalog and summarize the result
//! - query: regions, lookup and rate queries
//! - estimate: monthly cost estimates
//! - export: rate card JSON export
//! - watch: periodic refresh loop

pub mod check;
pub mod estimate;
pub mod export;
pub mod query;
pub mod watch;

use anyhow::Result;
use ratecard::catalog::{build_sources, PricingService};
use ratecard::config::Config;
use std::sync::Arc;
use tracing::warn;

/// Build the service and publish a card
///
/// The configured cache is loaded first so that a failing source still leaves
/// a usable card; a successful refresh rewrites the cache.
pub async fn load_service(cfg: &Config) -> Result<Arc<PricingService>> {
    let service = Arc::new(PricingService::new(cfg.to_region_policy()?));
    let sources = build_sources(&cfg.catalogs)?;

    let cached = match &cfg.cache.path {
        Some(path) => service.load_cache(path).await.unwrap_or_else(|e| {
            warn!("Ignoring rate card cache: {}", e);
            false
        }),
        None => false,
    };

    match service.refresh(&sources).await {
        Ok(_) => {
            if let Some(path) = &cfg.cache.path {
                service.save_cache(path).await?;
            }
        }
        Err(e) if cached => warn!("Refresh failed, using cached rate card: {}", e),
        Err(e) => return Err(e.into()),
    }

    Ok(service)
}
