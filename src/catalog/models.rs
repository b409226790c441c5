use crate::error::{PricingError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Currency code as published in a catalog `currencies` list
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Validate a three-letter upper-case code
    pub fn parse(code: &str) -> Result<Self> {
        if code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase()) {
            Ok(Self(code.to_string()))
        } else {
            Err(PricingError::malformed(format!("invalid currency code '{}'", code)))
        }
    }

    pub fn usd() -> Self {
        Self("USD".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Currency {
    type Error = PricingError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Currency> for String {
    fn from(value: Currency) -> Self {
        value.0
    }
}

impl FromStr for Currency {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Billing dimension a price applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RateKind {
    #[serde(rename = "perGB")]
    PerGb,
    #[serde(rename = "perGBmoProvStorage")]
    PerGbMonthProvStorage,
    #[serde(rename = "perPIOPSreq")]
    PerPiopsRequest,
    #[serde(rename = "perGBmoDataStored")]
    PerGbMonthDataStored,
    #[serde(rename = "perGBmoStorage")]
    PerGbMonthStorage,
    #[serde(rename = "perGBmoProvThroughput")]
    PerGbMonthProvThroughput,
}

impl RateKind {
    pub const ALL: [RateKind; 6] = [
        RateKind::PerGb,
        RateKind::PerGbMonthProvStorage,
        RateKind::PerPiopsRequest,
        RateKind::PerGbMonthDataStored,
        RateKind::PerGbMonthStorage,
        RateKind::PerGbMonthProvThroughput,
    ];

    /// Wire tag
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PerGb => "perGB",
            Self::PerGbMonthProvStorage => "perGBmoProvStorage",
            Self::PerPiopsRequest => "perPIOPSreq",
            Self::PerGbMonthDataStored => "perGBmoDataStored",
            Self::PerGbMonthStorage => "perGBmoStorage",
            Self::PerGbMonthProvThroughput => "perGBmoProvThroughput",
        }
    }

    /// Whether the price multiplies a stored/provisioned size in GB
    pub fn is_per_gb(&self) -> bool {
        !matches!(self, Self::PerPiopsRequest)
    }
}

impl FromStr for RateKind {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| PricingError::unknown_rate_kind(s, "not a recognized rate tag"))
    }
}

impl fmt::Display for RateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Product family, derived from the catalog region shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductFamily {
    /// EBS-style `types` catalogs
    BlockStorage,
    /// S3-style `tiers` catalogs
    ObjectStorage,
}

impl ProductFamily {
    pub fn rate_kinds(&self) -> &'static [RateKind] {
        match self {
            Self::BlockStorage => &[
                RateKind::PerGbMonthProvStorage,
                RateKind::PerPiopsRequest,
                RateKind::PerGbMonthDataStored,
                RateKind::PerGbMonthStorage,
                RateKind::PerGbMonthProvThroughput,
            ],
            Self::ObjectStorage => &[
                RateKind::PerGb,
                RateKind::PerGbMonthStorage,
                RateKind::PerGbMonthDataStored,
            ],
        }
    }

    pub fn allows(&self, kind: RateKind) -> bool {
        self.rate_kinds().contains(&kind)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::BlockStorage => "block storage",
            Self::ObjectStorage => "object storage",
        }
    }
}

/// Precedence version of a catalog: format generation first, then payload `vers`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CatalogVersion {
    pub generation: u32,
    pub revision: Decimal,
}

impl CatalogVersion {
    pub fn new(generation: u32, revision: Decimal) -> Self {
        Self {
            generation,
            revision,
        }
    }

    pub fn with_generation(self, generation: u32) -> Self {
        Self { generation, ..self }
    }
}

impl fmt::Display for CatalogVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}/{}", self.generation, self.revision)
    }
}

/// Decoded catalog payload
#[derive(Debug, Clone, PartialEq)]
pub struct RawCatalog {
    pub version: CatalogVersion,
    pub currencies: Vec<Currency>,
    /// Applies to tier prices and to type values that omit `rate`
    pub default_rate: Option<RateKind>,
    pub value_columns: Vec<String>,
    /// Footnote marker (e.g. `&dagger;`) to qualifier label
    pub footnotes: BTreeMap<String, String>,
    pub regions: Vec<RawRegion>,
}

impl RawCatalog {
    /// Family of the catalog, `None` when it has no regions at all
    pub fn family(&self) -> Option<ProductFamily> {
        self.regions.first().map(|r| r.prices.family())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawRegion {
    pub region: String,
    pub prices: RegionPrices,
}

/// The two observed region shapes
#[derive(Debug, Clone, PartialEq)]
pub enum RegionPrices {
    Types(Vec<RawType>),
    Tiers(Vec<RawTier>),
}

impl RegionPrices {
    pub fn family(&self) -> ProductFamily {
        match self {
            Self::Types(_) => ProductFamily::BlockStorage,
            Self::Tiers(_) => ProductFamily::ObjectStorage,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Types(types) => types.is_empty(),
            Self::Tiers(tiers) => tiers.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawType {
    pub name: String,
    pub values: Vec<RawValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawValue {
    pub prices: BTreeMap<Currency, Decimal>,
    /// Absent means the catalog default rate applies
    pub rate: Option<RateKind>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawTier {
    pub name: String,
    pub storage_types: Vec<RawStorageType>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawStorageType {
    pub storage_type: String,
    pub prices: BTreeMap<Currency, Decimal>,
}

/// Rate card key, without the rate kind
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RateKey {
    pub region: String,
    pub storage_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
}

impl RateKey {
    pub fn new(region: &str, storage_type: &str, tier: Option<&str>) -> Self {
        Self {
            region: region.to_string(),
            storage_type: storage_type.to_string(),
            tier: tier.map(str::to_string),
        }
    }
}

impl fmt::Display for RateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.region, self.storage_type)?;
        if let Some(tier) = &self.tier {
            write!(f, "/{}", tier)?;
        }
        Ok(())
    }
}

/// One canonical price record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateEntry {
    pub region: String,
    pub storage_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    pub rate_kind: RateKind,
    pub prices: BTreeMap<Currency, Decimal>,
    pub source_version: CatalogVersion,
    /// Durability or availability qualifier from the catalog footnotes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footnote: Option<String>,
}

impl RateEntry {
    pub fn key(&self) -> RateKey {
        RateKey {
            region: self.region.clone(),
            storage_type: self.storage_type.clone(),
            tier: self.tier.clone(),
        }
    }

    pub fn price(&self, currency: &Currency) -> Option<Decimal> {
        self.prices.get(currency).copied()
    }
}
