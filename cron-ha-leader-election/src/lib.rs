//! Lease-based leader election for cron-ha
//!
//! Hosts compete for one well-known key in the shared store. The first host
//! whose conditional set lands owns the key and keeps it alive by refreshing
//! its TTL; when it stops, the key expires and the next bidder takes over.
//!
//! # Overview
//!
//! - **Store-arbitrated**: mutual exclusion is the store's atomic set-if-absent
//! - **Fresh identity every cycle**: hostname and outbound addresses are
//!   re-resolved each tick, so network changes are picked up
//! - **Tick scheduler**: every sleep goes through an injectable
//!   [`Clock`](cron_ha_common::Clock), so loops can be stepped in tests
//! - **Primacy flag file**: optional mtime signal for external health checks
//!
//! # Example
//!
//! ```ignore
//! use cron_ha_leader_election::{ElectionConfig, LeaderElector, PrimacySignal};
//!
//! let config = ElectionConfig::new("cron:server_name", Duration::from_secs(5));
//! let elector = LeaderElector::new(config, connector)
//!     .with_signal(PrimacySignal::new("/run/cron-ha/primary"));
//!
//! if elector.query_is_primary().await? {
//!     println!("this host runs the jobs");
//! }
//!
//! // Or hold the lease for as long as the process lives
//! elector.cycle_forever().await;
//! ```

mod elector;
mod error;
mod identity;
mod signal;

pub use elector::{BidOutcome, ElectionConfig, LeaderElector, TickOutcome, RENEW_FRACTION};
pub use error::{ElectionError, Result};
pub use identity::{FixedIdentity, HostIdentity, IdentityParseError, IdentityResolver, SystemIdentity};
pub use signal::{PrimacySignal, PrimacySignalError};
