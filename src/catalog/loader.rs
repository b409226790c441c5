use crate::config::CatalogSourceConfig;
use crate::error::{PricingError, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Where a raw catalog payload comes from
///
/// Fetching is deliberately thin: no retry and no caching, the caller decides
/// when to call it again.
#[async_trait]
pub trait CatalogSource: Send + Sync + std::fmt::Debug {
    /// Name used in logs, errors and backups
    fn name(&self) -> &str;

    /// Catalog format generation (1 for the legacy endpoints, 2 for v2, ...)
    fn generation(&self) -> u32;

    /// Retrieve the raw JSONP payload
    async fn fetch(&self) -> Result<String>;
}

/// Catalog payload stored on disk
#[derive(Debug, Clone)]
pub struct FileSource {
    name: String,
    path: PathBuf,
    generation: u32,
}

impl FileSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, generation: u32) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            generation,
        }
    }
}

#[async_trait]
impl CatalogSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn generation(&self) -> u32 {
        self.generation
    }

    async fn fetch(&self) -> Result<String> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| PricingError::Source {
                source_name: self.name.clone(),
                message: format!("Failed to read {}: {}", self.path.display(), e),
            })?;
        debug!(source = %self.name, bytes = content.len(), "Read catalog file");
        Ok(content)
    }
}

/// Catalog payload served over HTTP
#[derive(Debug, Clone)]
pub struct HttpSource {
    name: String,
    url: String,
    generation: u32,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        generation: u32,
        timeout: Duration,
    ) -> Result<Self> {
        let name = name.into();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PricingError::Source {
                source_name: name.clone(),
                message: format!("Failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            name,
            url: url.into(),
            generation,
            client,
        })
    }
}

#[async_trait]
impl CatalogSource for HttpSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn generation(&self) -> u32 {
        self.generation
    }

    async fn fetch(&self) -> Result<String> {
        info!("Downloading pricing catalog from: {}", self.url);

        let response = self.client.get(&self.url).send().await?;

        if !response.status().is_success() {
            return Err(PricingError::Source {
                source_name: self.name.clone(),
                message: format!("Failed to download catalog: HTTP {}", response.status()),
            });
        }

        let content = response.text().await?;
        debug!(source = %self.name, bytes = content.len(), "Downloaded catalog");
        Ok(content)
    }
}

/// Build the configured sources; URLs become HTTP sources, anything else a file path
pub fn build_sources(configs: &[CatalogSourceConfig]) -> Result<Vec<Arc<dyn CatalogSource>>> {
    let mut sources: Vec<Arc<dyn CatalogSource>> = Vec::new();
    for cfg in configs.iter().filter(|c| c.enabled) {
        if cfg.location.starts_with("http://") || cfg.location.starts_with("https://") {
            sources.push(Arc::new(HttpSource::new(
                &cfg.name,
                &cfg.location,
                cfg.generation,
                Duration::from_secs(cfg.timeout_seconds),
            )?));
        } else {
            sources.push(Arc::new(FileSource::new(
                &cfg.name,
                &cfg.location,
                cfg.generation,
            )));
        }
    }
    Ok(sources)
}

/// Calculate SHA256 hash of content
pub fn calculate_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Save backup of a raw catalog payload
pub async fn save_backup(content: &str, backup_dir: &Path, source_name: &str) -> Result<PathBuf> {
    tokio::fs::create_dir_all(backup_dir).await?;

    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let filename = format!("{}_{}.js", sanitize_file_stem(source_name), timestamp);
    let filepath = backup_dir.join(filename);

    tokio::fs::write(&filepath, content).await?;

    info!("Saved catalog backup to: {}", filepath.display());
    Ok(filepath)
}

fn sanitize_file_stem(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
