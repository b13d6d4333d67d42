//! Lease store access for cron-ha
//!
//! The election and supervision logic only ever talks to the store through the
//! narrow capability traits defined here:
//!
//! - [`EndpointLocator`]: where is the store right now?
//! - [`StoreConnector`]: open a fresh connection for one tick
//! - [`LeaseStore`]: conditional set, forced set, get and TTL refresh
//!
//! [`RedisConnector`] implements them against Redis, locating the master either
//! from a fixed address ([`StaticLocator`]) or through Sentinel
//! ([`SentinelLocator`]).
//!
//! ```ignore
//! use cron_ha_store::{RedisConnector, StaticLocator, StoreConnector};
//! use std::sync::Arc;
//!
//! let locator = Arc::new(StaticLocator::new("127.0.0.1:6379".parse()?));
//! let connector = RedisConnector::new(locator, 0);
//!
//! let mut store = connector.connect().await?;
//! let outcome = store
//!     .set_if_absent("cron:server_name", "host-a/10.0.0.5/::1", Duration::from_secs(5))
//!     .await?;
//! store.close();
//! ```

mod error;
mod locator;
mod redis_store;
mod store;

pub use error::{Result, StoreError};
pub use locator::{EndpointLocator, SentinelLocator, StaticLocator, DEFAULT_DISCOVERY_TIMEOUT};
pub use redis_store::{
    RedisConnector, RedisLeaseStore, DEFAULT_COMMAND_TIMEOUT, DEFAULT_CONNECT_TIMEOUT,
};
pub use store::{ttl_seconds, LeaseStore, SetOutcome, StoreConnector};
