use crate::catalog::card::RateCard;
use crate::catalog::loader::CatalogSource;
use crate::catalog::normalizer::{merge, CatalogBatch};
use crate::catalog::parser::parse;
use crate::catalog::regions::RegionPolicy;
use crate::error::{PricingError, Result};
use crate::metrics;
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// A fetched catalog, ready for ingestion
#[derive(Debug, Clone)]
pub struct CatalogPayload {
    pub source: String,
    pub generation: u32,
    pub content: String,
    pub ingested_at: DateTime<Utc>,
}

impl CatalogPayload {
    pub fn new(source: impl Into<String>, generation: u32, content: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            generation,
            content: content.into(),
            ingested_at: Utc::now(),
        }
    }
}

/// Outcome of a successful refresh
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshReport {
    pub catalogs: usize,
    pub regions: usize,
    pub entries: usize,
    pub duration: Duration,
}

/// Parse, apply the region policy and extract one payload
pub fn ingest_payload(payload: &CatalogPayload, policy: &RegionPolicy) -> Result<CatalogBatch> {
    let mut catalog = parse(&payload.content)?;
    catalog.version = catalog.version.with_generation(payload.generation);
    let catalog = policy.apply(catalog);
    let batch = CatalogBatch::from_catalog(&payload.source, &catalog, payload.ingested_at)?;
    metrics::record_catalog(&payload.source, batch.entries.len());
    Ok(batch)
}

/// Owner of the published rate card
///
/// Readers call [`PricingService::current`] and keep the returned `Arc` for as
/// long as they need a consistent view. A refresh builds a complete new card
/// and swaps it in; a failed refresh leaves the published card untouched.
pub struct PricingService {
    card: Arc<ArcSwap<RateCard>>,
    policy: RegionPolicy,
}

impl PricingService {
    /// Create a service publishing an empty card
    pub fn new(policy: RegionPolicy) -> Self {
        Self::with_card(RateCard::default(), policy)
    }

    pub fn with_card(card: RateCard, policy: RegionPolicy) -> Self {
        Self {
            card: Arc::new(ArcSwap::from_pointee(card)),
            policy,
        }
    }

    /// Shared handle for readers living outside the service
    pub fn handle(&self) -> Arc<ArcSwap<RateCard>> {
        self.card.clone()
    }

    /// Currently published card
    pub fn current(&self) -> Arc<RateCard> {
        self.card.load_full()
    }

    /// Replace the published card
    pub fn publish(&self, card: RateCard) {
        self.card.store(Arc::new(card));
    }

    /// Build a card from payloads without publishing it
    ///
    /// Payloads are parsed and extracted in parallel on blocking tasks; the
    /// merge runs once every batch is available.
    pub async fn ingest(&self, payloads: Vec<CatalogPayload>) -> Result<RateCard> {
        let tasks = payloads.into_iter().map(|payload| {
            let policy = self.policy.clone();
            async move {
                let source = payload.source.clone();
                tokio::task::spawn_blocking(move || ingest_payload(&payload, &policy))
                    .await
                    .map_err(|e| {
                        PricingError::Internal(format!(
                            "ingestion task for '{}' failed: {}",
                            source, e
                        ))
                    })?
            }
        });
        let batches = try_join_all(tasks).await?;
        merge(&batches)
    }

    /// Ingest payloads and publish the resulting card
    pub async fn refresh_payloads(&self, payloads: Vec<CatalogPayload>) -> Result<RefreshReport> {
        let start = Instant::now();
        let catalogs = payloads.len();

        match self.ingest(payloads).await {
            Ok(card) => {
                let report = RefreshReport {
                    catalogs,
                    regions: card.list_regions().len(),
                    entries: card.len(),
                    duration: start.elapsed(),
                };
                self.publish(card);
                metrics::record_refresh(report.entries, report.regions, report.duration);
                info!(
                    catalogs = report.catalogs,
                    regions = report.regions,
                    entries = report.entries,
                    elapsed = ?report.duration,
                    "Rate card published"
                );
                Ok(report)
            }
            Err(e) => {
                metrics::record_refresh_failure(e.kind_name());
                error!("Rate card refresh aborted, keeping previous card: {}", e);
                Err(e)
            }
        }
    }

    /// Fetch every source, then ingest and publish
    pub async fn refresh(&self, sources: &[Arc<dyn CatalogSource>]) -> Result<RefreshReport> {
        let payloads = match fetch_all(sources).await {
            Ok(payloads) => payloads,
            Err(e) => {
                metrics::record_refresh_failure(e.kind_name());
                error!("Catalog fetch failed, keeping previous card: {}", e);
                return Err(e);
            }
        };
        self.refresh_payloads(payloads).await
    }

    /// Publish a card previously written by [`PricingService::save_cache`]
    ///
    /// Returns `false` when no cache file exists.
    pub async fn load_cache(&self, path: &Path) -> Result<bool> {
        if !tokio::fs::try_exists(path).await? {
            return Ok(false);
        }
        let content = tokio::fs::read_to_string(path).await?;
        let card: RateCard = serde_json::from_str(&content)
            .map_err(|e| PricingError::Cache(format!("{}: {}", path.display(), e)))?;
        info!(
            path = %path.display(),
            entries = card.len(),
            "Loaded rate card from cache"
        );
        self.publish(card);
        Ok(true)
    }

    /// Write the published card as JSON, replacing the file atomically
    pub async fn save_cache(&self, path: &Path) -> Result<()> {
        let card = self.current();
        let json = serde_json::to_string_pretty(card.as_ref())
            .map_err(|e| PricingError::Cache(e.to_string()))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

/// Fetch every source concurrently
pub async fn fetch_all(sources: &[Arc<dyn CatalogSource>]) -> Result<Vec<CatalogPayload>> {
    if sources.is_empty() {
        warn!("No catalog sources configured");
    }
    try_join_all(sources.iter().map(|source| async move {
        let content = source.fetch().await?;
        Ok::<_, PricingError>(CatalogPayload::new(
            source.name(),
            source.generation(),
            content,
        ))
    }))
    .await
}
