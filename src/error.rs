use crate::catalog::models::{Currency, RateKind};
use thiserror::Error;

/// Pricing pipeline error types
#[derive(Debug, Error)]
pub enum PricingError {
    /// Payload is not valid JSONP/JSON or misses required fields
    #[error("Malformed catalog: {0}")]
    MalformedCatalog(String),

    /// Rate tag outside the recognized set
    #[error("Unknown rate kind '{tag}' ({context})")]
    UnknownRateKind { tag: String, context: String },

    /// Two sources publish different prices with the same precedence
    #[error("Ambiguous rate for {key}: {detail}")]
    AmbiguousRate { key: String, detail: String },

    /// No entry for the requested combination
    #[error("Unknown rate: {0}")]
    UnknownRate(String),

    /// Entry exists but is not priced in the requested currency
    #[error("Unsupported currency {currency} for {key}")]
    UnsupportedCurrency { key: String, currency: Currency },

    /// Catalog source could not produce a payload
    #[error("Source error ({source_name}): {message}")]
    Source {
        source_name: String,
        message: String,
    },

    /// Rate card cache could not be read or written
    #[error("Cache error: {0}")]
    Cache(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Cost arithmetic exceeded the decimal range
    #[error("Estimate overflow: {0}")]
    EstimateOverflow(String),

    /// Ingestion task panicked or was cancelled
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PricingError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedCatalog(msg.into())
    }

    pub fn unknown_rate_kind(tag: impl Into<String>, context: impl Into<String>) -> Self {
        Self::UnknownRateKind {
            tag: tag.into(),
            context: context.into(),
        }
    }

    /// Short machine-readable name, used as a metrics label
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::MalformedCatalog(_) => "malformed_catalog",
            Self::UnknownRateKind { .. } => "unknown_rate_kind",
            Self::AmbiguousRate { .. } => "ambiguous_rate",
            Self::UnknownRate(_) => "unknown_rate",
            Self::UnsupportedCurrency { .. } => "unsupported_currency",
            Self::Source { .. } => "source",
            Self::Cache(_) => "cache",
            Self::Io(_) => "io",
            Self::EstimateOverflow(_) => "estimate_overflow",
            Self::Internal(_) => "internal",
        }
    }

    /// Query-time errors the caller can recover from (fallback currency, "no price")
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::UnknownRate(_) | Self::UnsupportedCurrency { .. })
    }
}

impl From<serde_json::Error> for PricingError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedCatalog(format!("JSON error: {}", err))
    }
}

impl From<reqwest::Error> for PricingError {
    fn from(err: reqwest::Error) -> Self {
        Self::Source {
            source_name: err
                .url()
                .map(|u| u.to_string())
                .unwrap_or_else(|| "http".to_string()),
            message: err.to_string(),
        }
    }
}

/// Helper for rate-kind context messages
pub(crate) fn rate_context(kind: RateKind, family: &str) -> String {
    format!("'{}' is not billed for {} catalogs", kind, family)
}

pub type Result<T> = std::result::Result<T, PricingError>;
