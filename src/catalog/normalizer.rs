use crate::catalog::card::RateCard;
use crate::catalog::extractor::extract;
use crate::catalog::models::{CatalogVersion, Currency, RateEntry, RateKey, RateKind, RawCatalog};
use crate::error::{PricingError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Entries of one ingested catalog, tagged for precedence
#[derive(Debug, Clone)]
pub struct CatalogBatch {
    /// Source name, only for logs and error messages
    pub source: String,
    pub version: CatalogVersion,
    pub ingested_at: DateTime<Utc>,
    /// Every region the catalog mentions, priced or not
    pub regions: Vec<String>,
    pub footnotes: BTreeMap<String, String>,
    pub entries: Vec<RateEntry>,
}

impl CatalogBatch {
    /// Extract a catalog into a batch
    pub fn from_catalog(
        source: impl Into<String>,
        catalog: &RawCatalog,
        ingested_at: DateTime<Utc>,
    ) -> Result<Self> {
        Ok(Self {
            source: source.into(),
            version: catalog.version,
            ingested_at,
            regions: catalog.regions.iter().map(|r| r.region.clone()).collect(),
            footnotes: catalog.footnotes.clone(),
            entries: extract(catalog)?,
        })
    }
}

type EntryKey = (RateKey, RateKind);

/// One batch's combined price map for a key
struct Candidate<'a> {
    batch: &'a CatalogBatch,
    prices: BTreeMap<Currency, Decimal>,
    footnote: Option<String>,
}

impl Candidate<'_> {
    fn precedence(&self) -> (CatalogVersion, DateTime<Utc>) {
        (self.batch.version, self.batch.ingested_at)
    }
}

/// Merge catalog batches into a single rate card
///
/// On a `(region, type, tier, rate kind)` collision the batch with the highest
/// version wins, then the latest ingestion time. Remaining ties are only
/// accepted when the prices are identical.
pub fn merge(batches: &[CatalogBatch]) -> Result<RateCard> {
    let mut candidates: BTreeMap<EntryKey, Vec<Candidate<'_>>> = BTreeMap::new();

    for batch in batches {
        for (key, candidate) in combine_batch(batch)? {
            candidates.entry(key).or_default().push(candidate);
        }
    }

    let mut entries = Vec::with_capacity(candidates.len());
    for ((key, rate_kind), mut contenders) in candidates {
        contenders.sort_by(|a, b| b.precedence().cmp(&a.precedence()));
        let winner = &contenders[0];

        for other in contenders[1..]
            .iter()
            .take_while(|c| c.precedence() == winner.precedence())
        {
            if other.prices != winner.prices {
                return Err(PricingError::AmbiguousRate {
                    key: format!("{}/{}", key, rate_kind),
                    detail: format!(
                        "'{}' and '{}' both publish {} at {} with different prices ({} vs {})",
                        winner.batch.source,
                        other.batch.source,
                        winner.batch.version,
                        winner.batch.ingested_at.to_rfc3339(),
                        format_prices(&winner.prices),
                        format_prices(&other.prices)
                    ),
                });
            }
        }

        if contenders.len() > 1 {
            debug!(
                key = %key,
                rate_kind = %rate_kind,
                winner = %winner.batch.source,
                version = %winner.batch.version,
                "Resolved rate collision"
            );
        }

        entries.push(RateEntry {
            region: key.region,
            storage_type: key.storage_type,
            tier: key.tier,
            rate_kind,
            prices: winner.prices.clone(),
            source_version: winner.batch.version,
            footnote: winner.footnote.clone(),
        });
    }

    // Later precedence overwrites conflicting footnote labels
    let mut ordered: Vec<&CatalogBatch> = batches.iter().collect();
    ordered.sort_by_key(|b| (b.version, b.ingested_at));
    let mut footnotes = BTreeMap::new();
    for batch in &ordered {
        footnotes.extend(batch.footnotes.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    let regions = batches.iter().flat_map(|b| b.regions.iter().cloned());
    let card = RateCard::from_parts(regions, entries, footnotes)?;

    info!(
        catalogs = batches.len(),
        regions = card.list_regions().len(),
        entries = card.len(),
        "Merged rate card"
    );
    Ok(card)
}

/// Fold a batch's per-currency entries into one price map per key
fn combine_batch(batch: &CatalogBatch) -> Result<BTreeMap<EntryKey, Candidate<'_>>> {
    let mut combined: BTreeMap<EntryKey, Candidate<'_>> = BTreeMap::new();

    for entry in &batch.entries {
        let candidate = combined
            .entry((entry.key(), entry.rate_kind))
            .or_insert_with(|| Candidate {
                batch,
                prices: BTreeMap::new(),
                footnote: None,
            });

        for (currency, price) in &entry.prices {
            match candidate.prices.get(currency) {
                Some(existing) if existing != price => {
                    return Err(PricingError::AmbiguousRate {
                        key: format!("{}/{}", entry.key(), entry.rate_kind),
                        detail: format!(
                            "'{}' lists {} twice ({} vs {})",
                            batch.source, currency, existing, price
                        ),
                    });
                }
                Some(_) => {}
                None => {
                    candidate.prices.insert(currency.clone(), *price);
                }
            }
        }
        if candidate.footnote.is_none() {
            candidate.footnote = entry.footnote.clone();
        }
    }

    Ok(combined)
}

fn format_prices(prices: &BTreeMap<Currency, Decimal>) -> String {
    prices
        .iter()
        .map(|(currency, price)| format!("{} {}", currency, price))
        .collect::<Vec<_>>()
        .join(", ")
}
