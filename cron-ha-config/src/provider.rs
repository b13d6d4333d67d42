//! Configuration provider using Figment

use crate::{ConfigError, ConfigResult, Settings};
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Config file used when none is given on the command line
pub const DEFAULT_CONFIG_FILE: &str = "cron-ha.yml";

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "CRON_HA_";

/// Configuration provider using figment
///
/// Loads defaults, then the YAML file, then `CRON_HA_*` environment variables.
/// The result is validated before it is handed out.
pub struct ConfigProvider {
    path: PathBuf,
}

impl ConfigProvider {
    /// Create a provider reading the YAML file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load and validate settings from all sources
    pub fn load(&self) -> ConfigResult<Settings> {
        debug!("Loading settings from {}", self.path.display());

        let settings: Settings = self.build_figment()?.extract()?;
        settings.validate()?;

        trace!("Loaded settings: {:?}", settings);
        Ok(settings)
    }

    /// Build the figment configuration with all sources in precedence order
    fn build_figment(&self) -> ConfigResult<Figment> {
        if !self.path.is_file() {
            return Err(ConfigError::FileNotFound {
                path: self.path.clone(),
            });
        }

        Ok(Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Yaml::file(&self.path))
            .merge(Env::prefixed(ENV_PREFIX)))
    }
}

impl Default for ConfigProvider {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_FILE)
    }
}

/// Load settings from the YAML file at `path` plus environment overrides
pub fn load_settings(path: impl AsRef<Path>) -> ConfigResult<Settings> {
    ConfigProvider::new(path.as_ref()).load()
}
