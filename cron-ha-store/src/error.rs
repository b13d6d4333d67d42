//! Error types for lease store access

use cron_ha_common::Endpoint;
use std::time::Duration;

/// Errors that can occur while talking to the lease store
///
/// Every variant means the store could not be reached or did not answer.
/// Callers decide per call site whether to retry or give up.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No sentinel could name the current master
    #[error("Failed to discover master '{master_name}': {reason}")]
    Discovery { master_name: String, reason: String },

    /// Could not open a connection
    #[error("Failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: Endpoint,
        #[source]
        source: redis::RedisError,
    },

    /// A command failed on an open connection
    #[error("{command} {key} failed: {source}")]
    Command {
        command: &'static str,
        key: String,
        #[source]
        source: redis::RedisError,
    },

    /// The endpoint did not answer in time
    #[error("Timed out after {timeout:?} waiting for {endpoint}")]
    Timeout { endpoint: Endpoint, timeout: Duration },

    /// The store is unreachable for a reason not covered above
    #[error("Store unreachable: {0}")]
    Unreachable(String),
}

impl StoreError {
    pub(crate) fn command(command: &'static str, key: &str, source: redis::RedisError) -> Self {
        StoreError::Command {
            command,
            key: key.to_string(),
            source,
        }
    }
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;
