//! Configuration
//!
//! Settings are layered with the `config` crate: built-in defaults, then the
//! global `$XDG_CONFIG_HOME/seda/config.toml`, then an explicit file, then
//! `SEDA__*` environment variables (`__` separates nested keys, e.g.
//! `SEDA__DOWNLOAD__MAX_CONCURRENCY=4`).

pub mod facade;
mod merge;
pub mod paths;
mod sources;

pub use facade::ConfigLoader;

use crate::collector::{HarvestDepth, HarvestOptions};
use crate::download::{BatchFailurePolicy, DownloadOptions, RetryPolicy, DEFAULT_MAX_CONCURRENCY};
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Complete runtime configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SedaConfig {
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub harvest: HarvestConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Defaults for downloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Directory files are written into when the command line names none
    pub destination: Option<PathBuf>,
    /// Base for recorded paths; the destination when unset
    pub relative_to: Option<PathBuf>,
    pub preferred_mirror: Option<Url>,
    pub skip_if_exists: bool,
    pub max_concurrency: usize,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    pub failure_policy: BatchFailurePolicy,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            destination: None,
            relative_to: None,
            preferred_mirror: None,
            skip_if_exists: true,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            retry_attempts: 1,
            retry_delay_ms: 500,
            failure_policy: BatchFailurePolicy::Collect,
        }
    }
}

impl DownloadConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_attempts, Duration::from_millis(self.retry_delay_ms))
    }

    /// Download options writing into `destination`.
    pub fn options(&self, destination: impl Into<PathBuf>) -> DownloadOptions {
        DownloadOptions {
            destination: destination.into(),
            relative_to: self.relative_to.clone(),
            preferred_mirror: self.preferred_mirror.clone(),
            skip_if_exists: self.skip_if_exists,
            max_concurrency: self.max_concurrency,
            retry: self.retry_policy(),
            failure_policy: self.failure_policy,
        }
    }
}

/// HTTP client settings shared by mirror fetches and remote catalogue reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    /// Whole-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("seda/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 300,
        }
    }
}

/// Settings for walking a collector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub depth: HarvestDepth,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    /// Leave a level unloaded instead of failing the whole harvest
    pub skip_failures: bool,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            depth: HarvestDepth::Partitions,
            retry_attempts: 3,
            retry_delay_ms: 1000,
            skip_failures: true,
        }
    }
}

impl HarvestConfig {
    pub fn options(&self) -> HarvestOptions {
        HarvestOptions {
            depth: self.depth,
            retry: RetryPolicy::new(self.retry_attempts, Duration::from_millis(self.retry_delay_ms)),
            skip_failures: self.skip_failures,
        }
    }
}
