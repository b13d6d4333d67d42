//! Typed cron-ha settings

use crate::{ConfigError, ConfigResult};
use cron_ha_common::Endpoint;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Immutable settings for one cron-ha invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Direct store endpoint, used when no sentinels are configured
    pub redis: String,

    /// Sentinel endpoints used to discover the current store master
    pub sentinels: Vec<String>,

    /// Master group name to ask the sentinels about
    pub sentinel_master_name: String,

    /// Logical database index
    pub redis_db_num: i64,

    /// Lease TTL in seconds; also the base poll interval
    pub timeout_sec: u64,

    /// Key holding the identity of the current primary
    pub server_key_name: String,

    /// Prefix for per-command lock keys
    pub lock_key_prefix: String,

    /// File whose mtime is bumped while this host believes it is primary
    pub primary_flag_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            redis: "127.0.0.1:6379".to_string(),
            sentinels: Vec::new(),
            sentinel_master_name: "mymaster".to_string(),
            redis_db_num: 0,
            timeout_sec: 5,
            server_key_name: "cron:server_name".to_string(),
            lock_key_prefix: "cron:lock:".to_string(),
            primary_flag_file: None,
        }
    }
}

/// Where the store lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// A fixed endpoint
    Direct(Endpoint),
    /// Resolved through sentinels on every connect
    Sentinel {
        sentinels: Vec<Endpoint>,
        master_name: String,
    },
}

impl Settings {
    /// Check every value that would otherwise fail later against the store
    pub fn validate(&self) -> ConfigResult<()> {
        if self.timeout_sec == 0 {
            return Err(ConfigError::invalid_value(
                "timeout_sec",
                "must be at least 1 second",
            ));
        }
        if self.server_key_name.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "server_key_name",
                "must not be empty",
            ));
        }
        if self.redis_db_num < 0 {
            return Err(ConfigError::invalid_value(
                "redis_db_num",
                "must not be negative",
            ));
        }
        self.store_location()?;
        Ok(())
    }

    /// Lease TTL
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.timeout_sec)
    }

    /// Resolve the configured endpoints into a [`StoreLocation`]
    pub fn store_location(&self) -> ConfigResult<StoreLocation> {
        if self.sentinels.is_empty() {
            let endpoint = self
                .redis
                .parse::<Endpoint>()
                .map_err(|e| ConfigError::invalid_value("redis", e.to_string()))?;
            return Ok(StoreLocation::Direct(endpoint));
        }

        if self.sentinel_master_name.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "sentinel_master_name",
                "must not be empty when sentinels are configured",
            ));
        }

        let sentinels = self
            .sentinels
            .iter()
            .map(|s| s.parse::<Endpoint>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ConfigError::invalid_value("sentinels", e.to_string()))?;

        Ok(StoreLocation::Sentinel {
            sentinels,
            master_name: self.sentinel_master_name.clone(),
        })
    }
}
