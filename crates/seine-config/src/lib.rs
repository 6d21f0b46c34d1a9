//! Seine Config - crawl configuration loaded from a TOML file.
//!
//! Every knob the crawler honors lives on [`CrawlerConfig`]; sections map
//! to sub-structs so the file reads the way the engine consumes it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Validation failure for a loaded configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("seed_urls must not be empty")]
    MissingSeeds,
    #[error("seed URL is not parseable: {0}")]
    InvalidSeed(String),
    #[error("allowed_domains must not be empty")]
    MissingDomains,
    #[error("rate_limit.delay must be a finite, non-negative number of seconds")]
    InvalidRateDelay,
    #[error("timeouts.connect and timeouts.read must be greater than zero")]
    InvalidTimeouts,
}

/// Minimum spacing between outbound requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Seconds between the start of two requests; 0 disables spacing.
    pub delay: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { delay: 1.0 }
    }
}

/// Split connect/read timeouts, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub connect: u64,
    pub read: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { connect: 10, read: 30 }
    }
}

/// Retry budget for the fetcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetriesConfig {
    /// Number of retries after the initial attempt.
    pub total: u32,
    /// Backoff seconds are `backoff_factor * 2^(retry - 1)`.
    pub backoff_factor: f64,
}

impl Default for RetriesConfig {
    fn default() -> Self {
        Self { total: 3, backoff_factor: 1.0 }
    }
}

/// Per-kind artifact directories plus the export target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputDirectories {
    pub html: PathBuf,
    pub md: PathBuf,
    pub pdf: PathBuf,
    pub pdf_text: PathBuf,
    pub video: PathBuf,
    pub transcripts: PathBuf,
    pub json: PathBuf,
}

impl Default for OutputDirectories {
    fn default() -> Self {
        Self {
            html: PathBuf::from("data/html"),
            md: PathBuf::from("data/md"),
            pdf: PathBuf::from("data/pdf"),
            pdf_text: PathBuf::from("data/pdf_text"),
            video: PathBuf::from("data/video"),
            transcripts: PathBuf::from("data/transcripts"),
            json: PathBuf::from("data/json"),
        }
    }
}

/// Full crawl configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Initial frontier; queued at depth 0, priority 100.
    pub seed_urls: Vec<String>,
    /// In-domain set; every other host is external and never fetched.
    /// Entries are `host` or `host:port` when a non-default port is used.
    pub allowed_domains: Vec<String>,
    /// Depth horizon for children of FAQ pages.
    pub max_depth_faq: u32,
    /// Depth horizon for children of everything else.
    pub max_depth_general: u32,
    pub user_agent: String,
    pub robots_enabled: bool,
    /// Section names excluded from the crawl, matched as
    /// lowercased-concatenated substrings of the hyphen-stripped URL path.
    pub excluded_sitemap_sections: Vec<String>,
    /// If non-empty, responses with any other base content type are skipped.
    pub content_type_allowlist: Vec<String>,
    /// Ordered selectors tried for main-content detection.
    pub main_content_selectors: Vec<String>,
    /// Host rewrites applied during canonicalization, e.g. apex -> www.
    pub host_aliases: HashMap<String, String>,
    pub db_path: PathBuf,
    /// How many interrupted attempts a frontier row survives before it is
    /// failed instead of re-queued on startup.
    pub queue_retry_cap: u32,
    pub rate_limit: RateLimitConfig,
    pub timeouts: TimeoutConfig,
    pub retries: RetriesConfig,
    pub output_directories: OutputDirectories,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            seed_urls: Vec::new(),
            allowed_domains: Vec::new(),
            max_depth_faq: 6,
            max_depth_general: 3,
            user_agent: "SeineBot/0.1".to_string(),
            robots_enabled: true,
            excluded_sitemap_sections: Vec::new(),
            content_type_allowlist: Vec::new(),
            main_content_selectors: vec![
                "main".to_string(),
                "#main-content".to_string(),
                "article".to_string(),
            ],
            host_aliases: HashMap::new(),
            db_path: PathBuf::from("data/crawl.db"),
            queue_retry_cap: 3,
            rate_limit: RateLimitConfig::default(),
            timeouts: TimeoutConfig::default(),
            retries: RetriesConfig::default(),
            output_directories: OutputDirectories::default(),
        }
    }
}

impl CrawlerConfig {
    /// Loads and parses a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Checks the invariants a crawl run depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.seed_urls.is_empty() {
            return Err(ConfigError::MissingSeeds);
        }
        for seed in &self.seed_urls {
            if Url::parse(seed).is_err() {
                return Err(ConfigError::InvalidSeed(seed.clone()));
            }
        }
        if self.allowed_domains.is_empty() {
            return Err(ConfigError::MissingDomains);
        }
        if !self.rate_limit.delay.is_finite() || self.rate_limit.delay < 0.0 {
            return Err(ConfigError::InvalidRateDelay);
        }
        if self.timeouts.connect == 0 || self.timeouts.read == 0 {
            return Err(ConfigError::InvalidTimeouts);
        }
        Ok(())
    }
}
