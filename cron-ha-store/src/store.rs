//! Lease store capability traits

use crate::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Result of a conditional set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetOutcome {
    /// Whether this call created the key
    pub written: bool,
    /// Value stored under the key right after the call, if any
    pub current: Option<String>,
}

/// One open connection to the lease store
///
/// Connections are short-lived: opened at the start of a tick, closed at its end.
#[async_trait]
pub trait LeaseStore: Send {
    /// Atomically write `value` only if `key` is absent, then read the key back
    async fn set_if_absent(&mut self, key: &str, value: &str, ttl: Duration)
        -> Result<SetOutcome>;

    /// Unconditionally write `value` with a fresh TTL
    async fn force_set(&mut self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Read the current value of `key`
    async fn get(&mut self, key: &str) -> Result<Option<String>>;

    /// Reset the TTL of `key` without touching its value
    ///
    /// Returns `false` when the key no longer exists. A missing key is never
    /// recreated; callers check ownership themselves before relying on this.
    async fn refresh_ttl(&mut self, key: &str, ttl: Duration) -> Result<bool>;

    /// Release the connection
    fn close(self: Box<Self>) {}
}

/// Opens fresh [`LeaseStore`] connections
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn LeaseStore>>;
}

/// Whole seconds for a store TTL, never less than one
pub fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}
