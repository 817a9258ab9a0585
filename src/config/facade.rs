//! ConfigLoader facade delegating to merge service.

use super::merge::service::MergeService;
use super::SedaConfig;
use config::ConfigError;
use std::path::Path;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the global file, `explicit` (if any) and environment.
    pub fn load(explicit: Option<&Path>) -> Result<SedaConfig, ConfigError> {
        MergeService::load(explicit)
    }

    /// Load configuration from a specific file with environment overlay.
    pub fn load_from_file(path: &Path) -> Result<SedaConfig, ConfigError> {
        MergeService::load_from_file(path)
    }

    /// Create default configuration.
    pub fn default() -> SedaConfig {
        SedaConfig::default()
    }
}
