use crate::catalog::card::RateCard;
use crate::catalog::models::{Currency, RateKind};
use crate::error::{PricingError, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

const GB_PER_TB: i64 = 1024;

/// One priced line of an estimate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostLine {
    pub rate_kind: RateKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub cost: Decimal,
}

/// Monthly cost estimate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub currency: Currency,
    pub lines: Vec<CostLine>,
    pub total: Decimal,
}

impl CostBreakdown {
    pub fn zero(currency: Currency) -> Self {
        Self {
            currency,
            lines: Vec::new(),
            total: Decimal::ZERO,
        }
    }

    fn push(
        &mut self,
        rate_kind: RateKind,
        tier: Option<&str>,
        quantity: Decimal,
        unit_price: Decimal,
    ) -> Result<()> {
        let cost = quantity.checked_mul(unit_price).ok_or_else(|| {
            PricingError::EstimateOverflow(format!("{} x {} at {}", quantity, unit_price, rate_kind))
        })?;
        self.lines.push(CostLine {
            rate_kind,
            tier: tier.map(str::to_string),
            quantity,
            unit_price,
            cost,
        });
        Ok(())
    }

    pub fn calculate_total(&mut self) -> Result<()> {
        self.total = self.lines.iter().try_fold(Decimal::ZERO, |total, line| {
            total
                .checked_add(line.cost)
                .ok_or_else(|| PricingError::EstimateOverflow("total cost".to_string()))
        })?;
        Ok(())
    }
}

/// Volume band a tier id describes, in TB
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum TierBand {
    First(u32),
    Next(u32),
    Over(u32),
}

impl TierBand {
    /// `first50TBstorage`, `next450TBstorage`, `over500TBstorage`
    fn parse(tier: &str) -> Option<Self> {
        let (ctor, rest): (fn(u32) -> Self, &str) = if let Some(rest) = tier.strip_prefix("first") {
            (Self::First, rest)
        } else if let Some(rest) = tier.strip_prefix("next") {
            (Self::Next, rest)
        } else if let Some(rest) = tier.strip_prefix("over") {
            (Self::Over, rest)
        } else {
            return None;
        };

        let digits = rest.chars().take_while(char::is_ascii_digit).count();
        if digits == 0 || !rest[digits..].starts_with("TB") {
            return None;
        }
        rest[..digits].parse().ok().map(ctor)
    }
}

/// Estimates monthly storage costs against a published rate card
pub struct CostCalculator {
    card: Arc<RateCard>,
}

impl CostCalculator {
    pub fn new(card: Arc<RateCard>) -> Self {
        Self { card }
    }

    /// Monthly cost of a block storage volume
    ///
    /// Per-GB-month rates are charged on `size_gb`, the provisioned IOPS rate
    /// on `iops`. Rate kinds the type does not publish are simply not charged.
    pub fn volume_monthly(
        &self,
        region: &str,
        storage_type: &str,
        size_gb: Decimal,
        iops: Decimal,
        currency: &Currency,
    ) -> Result<CostBreakdown> {
        let entries = self.card.lookup(region, storage_type, None);
        if entries.is_empty() {
            return Err(PricingError::UnknownRate(format!("{}/{}", region, storage_type)));
        }

        let mut breakdown = CostBreakdown::zero(currency.clone());
        for entry in entries {
            let quantity = match entry.rate_kind {
                RateKind::PerGbMonthProvStorage
                | RateKind::PerGbMonthStorage
                | RateKind::PerGbMonthDataStored => size_gb,
                RateKind::PerPiopsRequest => iops,
                other => {
                    debug!(rate_kind = %other, storage_type, "Rate not used for volume estimates");
                    continue;
                }
            };
            let unit_price = self
                .card
                .rate(region, storage_type, entry.rate_kind, None, currency)?;
            breakdown.push(entry.rate_kind, None, quantity, unit_price)?;
        }

        breakdown.calculate_total()?;
        Ok(breakdown)
    }

    /// Monthly cost of `size_gb` stored in a tiered object storage class
    ///
    /// Tiers are walked in volume order; each slice of the size is charged at
    /// the per-GB rate the tier publishes, whichever rate tag the catalog uses.
    pub fn tiered_monthly(
        &self,
        region: &str,
        storage_type: &str,
        size_gb: Decimal,
        currency: &Currency,
    ) -> Result<CostBreakdown> {
        let mut bands: Vec<(TierBand, &str)> = Vec::new();
        for tier in self.card.tiers(region, storage_type) {
            match TierBand::parse(tier) {
                Some(band) => bands.push((band, tier)),
                None => warn!(tier, "Tier id has no volume breakpoint, skipping"),
            }
        }
        if bands.is_empty() {
            return Err(PricingError::UnknownRate(format!(
                "{}/{} has no tiered rates",
                region, storage_type
            )));
        }
        bands.sort();

        let mut breakdown = CostBreakdown::zero(currency.clone());
        let mut lower = Decimal::ZERO;

        for (band, tier) in bands {
            if size_gb <= lower && !matches!(band, TierBand::Over(_)) {
                break;
            }
            let (start, end) = match band {
                TierBand::First(n) => (Decimal::ZERO, Some(band_size(n)?)),
                TierBand::Next(n) => (lower, Some(checked_end(lower, band_size(n)?)?)),
                TierBand::Over(n) => (band_size(n)?, None),
            };
            let upper = end.map_or(size_gb, |end| end.min(size_gb));
            if upper <= start {
                continue;
            }

            let rate_kind = self
                .card
                .lookup(region, storage_type, Some(tier))
                .into_iter()
                .map(|entry| entry.rate_kind)
                .find(RateKind::is_per_gb)
                .ok_or_else(|| {
                    PricingError::UnknownRate(format!(
                        "{}/{}/{} has no per-GB rate",
                        region, storage_type, tier
                    ))
                })?;
            let unit_price = self
                .card
                .rate(region, storage_type, rate_kind, Some(tier), currency)?;
            breakdown.push(rate_kind, Some(tier), upper - start, unit_price)?;
            lower = end.unwrap_or(size_gb);
        }

        breakdown.calculate_total()?;
        Ok(breakdown)
    }
}

/// Size of an `n` TB band in GB
fn band_size(n: u32) -> Result<Decimal> {
    Decimal::from(n)
        .checked_mul(Decimal::from(GB_PER_TB))
        .ok_or_else(|| PricingError::EstimateOverflow(format!("{} TB band", n)))
}

fn checked_end(lower: Decimal, size: Decimal) -> Result<Decimal> {
    lower
        .checked_add(size)
        .ok_or_else(|| PricingError::EstimateOverflow(format!("tier ending past {} GB", lower)))
}
