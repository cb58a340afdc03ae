//! # spejare-config
//!
//! Layered configuration for the spejare capture service: defaults, an
//! optional `config/spejare.yaml`, and `SPEJARE_*` environment overrides,
//! validated before use.

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod capture;
mod error;
mod service;
mod validation;

pub use capture::CaptureConfig;
pub use error::ConfigError;
pub use service::{StoreConfig, StreamConfig};

/// Top-level configuration container.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone)]
pub struct SpejareConfig {
    /// Live capture parameters.
    #[validate(nested)]
    pub capture: CaptureConfig,

    /// Bounded packet history.
    #[validate(nested)]
    pub store: StoreConfig,

    /// Live stream fan-out.
    #[validate(nested)]
    pub stream: StreamConfig,
}

impl SpejareConfig {
    /// Load configuration from default locations and the environment.
    ///
    /// Hierarchy:
    /// 1. Default values
    /// 2. `config/spejare.yaml` (skipped when missing)
    /// 3. `SPEJARE_*` environment variables (`__` splits nesting)
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(SpejareConfig::default()));

        if Path::new("config/spejare.yaml").exists() {
            figment = figment.merge(Yaml::file("config/spejare.yaml"));
        }

        figment
            .merge(Env::prefixed("SPEJARE_").split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }

    /// Load configuration from a specific file.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        Figment::from(Serialized::defaults(SpejareConfig::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed("SPEJARE_").split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = SpejareConfig::default();
        config.validate().expect("default config should validate");
        assert_eq!(config.store.capacity, 1000);
        assert_eq!(config.store.default_query_limit, 100);
        assert_eq!(config.stream.queue_capacity, 256);
    }

    #[test]
    fn environment_override() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("SPEJARE_CAPTURE__INTERFACE", "wlan0");
            jail.set_env("SPEJARE_STORE__CAPACITY", "500");
            let config = SpejareConfig::load().expect("load should succeed");
            assert_eq!(config.capture.interface, "wlan0");
            assert_eq!(config.store.capacity, 500);
            Ok(())
        });
    }

    #[test]
    fn invalid_interface_is_rejected() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("SPEJARE_CAPTURE__INTERFACE", "not a valid name!");
            let result = SpejareConfig::load();
            assert!(matches!(result, Err(ConfigError::Validation(_))));
            Ok(())
        });
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let result = SpejareConfig::load_from_path("does/not/exist.yaml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }
}
