use crate::catalog::regions::RegionPolicy;
use anyhow::Context;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub catalogs: Vec<CatalogSourceConfig>,
    #[serde(default)]
    pub regions: RegionConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogSourceConfig {
    pub name: String,
    /// File path or http(s) URL of the JSONP payload
    pub location: String,

    /// Catalog format generation, outranks the payload `vers` (default: 1)
    #[serde(default = "default_generation")]
    pub generation: u32,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// HTTP timeout, ignored for files (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

/// Region renaming and filtering
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RegionConfig {
    /// Legacy region code -> current region code
    #[serde(default)]
    pub aliases: HashMap<String, String>,

    /// Only regions matching this pattern are kept
    #[serde(default)]
    pub enabled_pattern: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RefreshConfig {
    /// Interval between catalog checks in `watch` mode (default: 3600)
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,

    /// Directory for timestamped payload backups (disabled when unset)
    #[serde(default)]
    pub backup_dir: Option<PathBuf>,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval_seconds(),
            backup_dir: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CacheConfig {
    /// JSON rate card cache, loaded at startup and written after refreshes
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// "text" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_generation() -> u32 {
    1
}

fn default_enabled() -> bool {
    true
}

fn default_timeout() -> u64 {
    30
}

fn default_interval_seconds() -> u64 {
    3600
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// Build the region policy used during ingestion
    pub fn to_region_policy(&self) -> anyhow::Result<RegionPolicy> {
        let enabled = self
            .regions
            .enabled_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .context("Invalid regions.enabled_pattern")?;
        Ok(RegionPolicy::new(self.regions.aliases.clone(), enabled))
    }
}

/// Load configuration from a TOML file with `RATECARD__*` environment overrides
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let config = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(config::Environment::with_prefix("RATECARD").separator("__"))
        .build()
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;

    let cfg: Config = config.try_deserialize()?;
    validate_config(&cfg)?;
    Ok(cfg)
}

fn validate_config(cfg: &Config) -> anyhow::Result<()> {
    // Validate at least one catalog is enabled
    if !cfg.catalogs.iter().any(|c| c.enabled) {
        anyhow::bail!("At least one catalog source must be enabled");
    }

    // Validate catalog names are unique, they key backups and hashes
    let mut seen = HashSet::new();
    for catalog in &cfg.catalogs {
        if catalog.name.is_empty() {
            anyhow::bail!("Catalog source name cannot be empty");
        }
        if !seen.insert(catalog.name.as_str()) {
            anyhow::bail!("Duplicate catalog source name: '{}'", catalog.name);
        }
        if catalog.location.is_empty() {
            anyhow::bail!("Catalog '{}' has no location", catalog.name);
        }
        if catalog.generation == 0 {
            anyhow::bail!("Catalog '{}': generation must be at least 1", catalog.name);
        }
        if catalog.timeout_seconds == 0 {
            anyhow::bail!("Catalog '{}': timeout_seconds must be greater than 0", catalog.name);
        }
    }

    if cfg.refresh.interval_seconds == 0 {
        anyhow::bail!("refresh.interval_seconds must be greater than 0");
    }

    if let Some(pattern) = &cfg.regions.enabled_pattern {
        Regex::new(pattern).with_context(|| format!("Invalid regions.enabled_pattern '{}'", pattern))?;
    }

    match cfg.logging.format.as_str() {
        "text" | "json" => {}
        other => anyhow::bail!("Invalid logging.format '{}', expected 'text' or 'json'", other),
    }

    Ok(())
}
