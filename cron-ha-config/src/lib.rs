//! cron-ha configuration management using Figment
//!
//! Settings are loaded once at startup and passed by value into every component
//! that needs them. Sources are merged in precedence order, later ones winning:
//!
//! 1. Built-in defaults ([`Settings::default`])
//! 2. The YAML configuration file (`cron-ha.yml` unless overridden)
//! 3. Environment variables prefixed with `CRON_HA_`
//!
//! # Example YAML Configuration
//!
//! ```yaml
//! sentinels:
//!   - 10.0.0.1:26379
//!   - "[fd00::2]:26379"
//! sentinel_master_name: cron
//! timeout_sec: 10
//! primary_flag_file: /run/cron-ha/primary
//! ```
//!
//! # Environment Variables
//!
//! ```bash
//! export CRON_HA_TIMEOUT_SEC=10          # → timeout_sec
//! export CRON_HA_REDIS=10.0.0.7:6379     # → redis
//! ```

mod error;
mod provider;
mod settings;

pub use error::ConfigError;
pub use provider::{load_settings, ConfigProvider, DEFAULT_CONFIG_FILE, ENV_PREFIX};
pub use settings::{Settings, StoreLocation};

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
