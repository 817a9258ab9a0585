//! Layer composition for configuration sources.

pub(crate) mod service;

pub(crate) mod merge_policy {
    //! Base layer every load starts from.

    use crate::config::SedaConfig;
    use config::builder::DefaultState;
    use config::{Config, ConfigBuilder, ConfigError};

    /// Builder seeded with the serialized defaults, so sparse files only
    /// need to name the keys they change.
    pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let defaults = Config::try_from(&SedaConfig::default())?;
        Ok(Config::builder().add_source(defaults))
    }
}
