pub mod calculator;
pub mod card;
pub mod extractor;
pub mod loader;
pub mod models;
pub mod normalizer;
pub mod parser;
pub mod regions;
pub mod service;
pub mod updater;

pub use calculator::{CostBreakdown, CostCalculator, CostLine};
pub use card::RateCard;
pub use extractor::extract;
pub use loader::{build_sources, CatalogSource, FileSource, HttpSource};
pub use models::{
    CatalogVersion, Currency, ProductFamily, RateEntry, RateKey, RateKind, RawCatalog,
};
pub use normalizer::{merge, CatalogBatch};
pub use parser::parse;
pub use regions::RegionPolicy;
pub use service::{CatalogPayload, PricingService, RefreshReport};
pub use updater::PricingUpdater;
