use crate::catalog::models::{Currency, RateEntry, RateKey, RateKind};
use crate::error::{PricingError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Normalized, read-only view of every known price
///
/// Built in full by the normalizer and never mutated afterwards; a refresh
/// produces a new card that replaces the published one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(into = "RateCardData", try_from = "RateCardData")]
pub struct RateCard {
    regions: BTreeSet<String>,
    rates: BTreeMap<RateKey, BTreeMap<RateKind, RateEntry>>,
    footnotes: BTreeMap<String, String>,
}

/// Self-describing cache representation
#[derive(Debug, Serialize, Deserialize)]
struct RateCardData {
    regions: BTreeSet<String>,
    #[serde(default)]
    footnotes: BTreeMap<String, String>,
    entries: Vec<RateEntry>,
}

impl From<RateCard> for RateCardData {
    fn from(card: RateCard) -> Self {
        Self {
            regions: card.regions,
            footnotes: card.footnotes,
            entries: card
                .rates
                .into_values()
                .flat_map(|by_kind| by_kind.into_values())
                .collect(),
        }
    }
}

impl TryFrom<RateCardData> for RateCard {
    type Error = PricingError;

    fn try_from(data: RateCardData) -> Result<Self> {
        RateCard::from_parts(data.regions, data.entries, data.footnotes)
    }
}

impl RateCard {
    /// Assemble a card, rejecting duplicate `(region, type, tier, rate kind)` keys
    pub(crate) fn from_parts(
        regions: impl IntoIterator<Item = String>,
        entries: impl IntoIterator<Item = RateEntry>,
        footnotes: BTreeMap<String, String>,
    ) -> Result<Self> {
        let mut card = RateCard {
            regions: regions.into_iter().collect(),
            rates: BTreeMap::new(),
            footnotes,
        };

        for entry in entries {
            if entry.prices.is_empty() {
                return Err(PricingError::malformed(format!(
                    "rate {}/{} has no price",
                    entry.key(),
                    entry.rate_kind
                )));
            }
            card.regions.insert(entry.region.clone());
            let by_kind = card.rates.entry(entry.key()).or_default();
            if by_kind.contains_key(&entry.rate_kind) {
                return Err(PricingError::AmbiguousRate {
                    key: format!("{}/{}", entry.key(), entry.rate_kind),
                    detail: "duplicate entry in rate card".to_string(),
                });
            }
            by_kind.insert(entry.rate_kind, entry);
        }

        Ok(card)
    }

    /// All rate kinds priced for a storage type (and tier); empty when unpriced
    pub fn lookup(&self, region: &str, storage_type: &str, tier: Option<&str>) -> Vec<&RateEntry> {
        self.rates
            .get(&RateKey::new(region, storage_type, tier))
            .map(|by_kind| by_kind.values().collect())
            .unwrap_or_default()
    }

    /// Every storage type priced under one tier of a region
    pub fn lookup_tier(&self, region: &str, tier: &str) -> Vec<&RateEntry> {
        self.rates
            .iter()
            .filter(|(key, _)| key.region == region && key.tier.as_deref() == Some(tier))
            .flat_map(|(_, by_kind)| by_kind.values())
            .collect()
    }

    /// Price of one rate in one currency
    pub fn rate(
        &self,
        region: &str,
        storage_type: &str,
        rate_kind: RateKind,
        tier: Option<&str>,
        currency: &Currency,
    ) -> Result<Decimal> {
        let key = RateKey::new(region, storage_type, tier);
        let entry = self
            .rates
            .get(&key)
            .and_then(|by_kind| by_kind.get(&rate_kind))
            .ok_or_else(|| PricingError::UnknownRate(format!("{}/{}", key, rate_kind)))?;

        entry
            .price(currency)
            .ok_or_else(|| PricingError::UnsupportedCurrency {
                key: format!("{}/{}", key, rate_kind),
                currency: currency.clone(),
            })
    }

    pub fn list_regions(&self) -> &BTreeSet<String> {
        &self.regions
    }

    /// Distinguishes "region unknown" from "region known but unpriced"
    pub fn has_region(&self, region: &str) -> bool {
        self.regions.contains(region)
    }

    pub fn storage_types(&self, region: &str) -> BTreeSet<&str> {
        self.rates
            .keys()
            .filter(|key| key.region == region)
            .map(|key| key.storage_type.as_str())
            .collect()
    }

    /// Tier ids priced for a storage type, in key order
    pub fn tiers(&self, region: &str, storage_type: &str) -> Vec<&str> {
        self.rates
            .keys()
            .filter(|key| key.region == region && key.storage_type == storage_type)
            .filter_map(|key| key.tier.as_deref())
            .collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = &RateEntry> {
        self.rates.values().flat_map(|by_kind| by_kind.values())
    }

    pub fn currencies(&self) -> BTreeSet<&Currency> {
        self.entries().flat_map(|e| e.prices.keys()).collect()
    }

    pub fn footnotes(&self) -> &BTreeMap<String, String> {
        &self.footnotes
    }

    /// Number of rate entries
    pub fn len(&self) -> usize {
        self.rates.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}
