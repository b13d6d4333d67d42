//! Lease acquisition, renewal and queries

use crate::identity::{HostIdentity, IdentityResolver, SystemIdentity};
use crate::signal::PrimacySignal;
use crate::Result;
use cron_ha_common::{Clock, TokioClock};
use cron_ha_store::{LeaseStore, StoreConnector};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Share of the TTL slept between renewals
///
/// Leaves a fifth of the lease as headroom for a slow tick.
pub const RENEW_FRACTION: f64 = 0.8;

/// What an election needs to know about its lease
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElectionConfig {
    /// Store key holding the primary's identity
    pub lease_key: String,
    /// Lease lifetime
    pub ttl: Duration,
}

impl ElectionConfig {
    pub fn new(lease_key: impl Into<String>, ttl: Duration) -> Self {
        Self {
            lease_key: lease_key.into(),
            ttl,
        }
    }

    /// Delay between renewals
    pub fn renew_interval(&self) -> Duration {
        self.ttl.mul_f64(RENEW_FRACTION)
    }
}

/// Result of a single bid for the lease
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BidOutcome {
    /// The key was free and this bid created it
    WonAsNew,
    /// This identity already held the key and renewed it
    ConfirmedIncumbent,
    /// Someone else holds the key; `None` if it expired before the read-back
    LostToOther { holder: Option<String> },
}

impl BidOutcome {
    pub fn is_primary(&self) -> bool {
        matches!(self, BidOutcome::WonAsNew | BidOutcome::ConfirmedIncumbent)
    }
}

/// Result of one scheduler step of [`LeaderElector::cycle_forever`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Bid(BidOutcome),
    /// The store could not be reached; the tick backed off for a full TTL
    Unreachable,
}

/// Runs the acquire/renew cycle for one lease key
///
/// Each operation opens its own store connection and closes it before
/// returning, so nothing is held across sleeps.
pub struct LeaderElector {
    config: ElectionConfig,
    connector: Arc<dyn StoreConnector>,
    identity: Arc<dyn IdentityResolver>,
    clock: Arc<dyn Clock>,
    signal: PrimacySignal,
}

impl LeaderElector {
    /// Create an elector using the real host identity, the tokio clock and no
    /// flag file
    pub fn new(config: ElectionConfig, connector: Arc<dyn StoreConnector>) -> Self {
        Self {
            config,
            connector,
            identity: Arc::new(HostIdentity),
            clock: Arc::new(TokioClock::new()),
            signal: PrimacySignal::disabled(),
        }
    }

    pub fn with_identity(mut self, identity: Arc<dyn IdentityResolver>) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_signal(mut self, signal: PrimacySignal) -> Self {
        self.signal = signal;
        self
    }

    pub fn config(&self) -> &ElectionConfig {
        &self.config
    }

    pub fn connector(&self) -> &Arc<dyn StoreConnector> {
        &self.connector
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Identity this host would bid with right now
    pub fn resolve_identity(&self) -> SystemIdentity {
        self.identity.resolve()
    }

    /// Try to take or keep the lease on an open connection
    pub async fn bid_once(
        &self,
        store: &mut dyn LeaseStore,
        identity: &SystemIdentity,
    ) -> Result<BidOutcome> {
        let key = &self.config.lease_key;
        let outcome = store
            .set_if_absent(key, &identity.to_string(), self.config.ttl)
            .await?;

        match outcome.current {
            Some(holder) if identity.matches(&holder) => {
                debug!(lease_key = %key, %identity, "Lease held by this host, extending expiry");
                store.refresh_ttl(key, self.config.ttl).await?;
                self.touch_signal();

                if outcome.written {
                    Ok(BidOutcome::WonAsNew)
                } else {
                    Ok(BidOutcome::ConfirmedIncumbent)
                }
            }
            holder => {
                debug!(lease_key = %key, holder = ?holder, "Lease held by another host");
                self.remove_signal();
                Ok(BidOutcome::LostToOther { holder })
            }
        }
    }

    /// One scheduler step: resolve, connect, bid, close, sleep
    pub async fn tick(&self) -> TickOutcome {
        let identity = self.identity.resolve();

        match self.bid(&identity).await {
            Ok(outcome) => {
                match &outcome {
                    BidOutcome::WonAsNew => {
                        info!(lease_key = %self.config.lease_key, %identity, "Acquired primary lease")
                    }
                    BidOutcome::ConfirmedIncumbent => {
                        debug!(lease_key = %self.config.lease_key, "Renewed primary lease")
                    }
                    BidOutcome::LostToOther { holder } => {
                        debug!(lease_key = %self.config.lease_key, holder = ?holder, "Standing by")
                    }
                }
                self.clock.sleep(self.config.renew_interval()).await;
                TickOutcome::Bid(outcome)
            }
            Err(e) => {
                warn!(error = %e, "Lease store unreachable, retrying in {:?}", self.config.ttl);
                self.clock.sleep(self.config.ttl).await;
                TickOutcome::Unreachable
            }
        }
    }

    /// Bid for the lease forever; never returns
    ///
    /// Store failures are logged and retried after a full TTL.
    pub async fn cycle_forever(&self) {
        info!(lease_key = %self.config.lease_key, ttl = ?self.config.ttl, "Starting election cycle");
        loop {
            self.tick().await;
        }
    }

    /// Take the lease unconditionally
    ///
    /// Bypasses mutual exclusion; meant for manual failover.
    pub async fn force_acquire(&self) -> Result<SystemIdentity> {
        let identity = self.identity.resolve();
        let mut store = self.connector.connect().await?;
        let result = store
            .force_set(&self.config.lease_key, &identity.to_string(), self.config.ttl)
            .await;
        store.close();
        result?;

        info!(lease_key = %self.config.lease_key, %identity, "Forced primary lease");
        self.touch_signal();
        Ok(identity)
    }

    /// Whether this host holds the lease at this instant
    pub async fn query_is_primary(&self) -> Result<bool> {
        let identity = self.identity.resolve();
        let mut store = self.connector.connect().await?;
        let result = self.is_primary_on(store.as_mut(), &identity).await;
        store.close();
        result
    }

    /// Whether `identity` holds the lease, using an open connection
    pub async fn is_primary_on(
        &self,
        store: &mut dyn LeaseStore,
        identity: &SystemIdentity,
    ) -> Result<bool> {
        let holder = store.get(&self.config.lease_key).await?;
        Ok(holder.is_some_and(|h| identity.matches(&h)))
    }

    async fn bid(&self, identity: &SystemIdentity) -> Result<BidOutcome> {
        let mut store = self.connector.connect().await?;
        let result = self.bid_once(store.as_mut(), identity).await;
        store.close();
        result
    }

    fn touch_signal(&self) {
        if let Err(e) = self.signal.touch() {
            warn!(error = %e, "Could not update primacy flag");
        }
    }

    fn remove_signal(&self) {
        if let Err(e) = self.signal.remove() {
            warn!(error = %e, "Could not clear primacy flag");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FixedIdentity;
    use cron_ha_test_utils::{create_temp_dir, ManualClock, MemoryStore};
    use std::net::{Ipv4Addr, Ipv6Addr};
    use tracing_test::traced_test;

    const KEY: &str = "cron:server_name";
    const TTL: Duration = Duration::from_secs(5);

    fn host(name: &str, last_octet: u8) -> SystemIdentity {
        SystemIdentity::new(
            name,
            Ipv4Addr::new(10, 0, 0, last_octet),
            Ipv6Addr::LOCALHOST,
        )
    }

    fn elector(
        store: &MemoryStore,
        clock: &Arc<ManualClock>,
        identity: SystemIdentity,
    ) -> LeaderElector {
        LeaderElector::new(ElectionConfig::new(KEY, TTL), Arc::new(store.clone()))
            .with_identity(Arc::new(FixedIdentity(identity)))
            .with_clock(clock.clone())
    }

    #[test]
    fn test_renew_interval_is_eighty_percent() {
        let config = ElectionConfig::new(KEY, TTL);
        assert_eq!(config.renew_interval(), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_bid_once_outcomes() {
        let clock = Arc::new(ManualClock::new());
        let store = MemoryStore::new(clock.clone());
        let a = host("host-a", 1);
        let b = host("host-b", 2);
        let elector_a = elector(&store, &clock, a.clone());
        let mut conn = store.connect().await.unwrap();

        assert_eq!(
            elector_a.bid_once(conn.as_mut(), &a).await.unwrap(),
            BidOutcome::WonAsNew
        );
        assert_eq!(
            elector_a.bid_once(conn.as_mut(), &a).await.unwrap(),
            BidOutcome::ConfirmedIncumbent
        );
        assert_eq!(
            elector_a.bid_once(conn.as_mut(), &b).await.unwrap(),
            BidOutcome::LostToOther {
                holder: Some(a.to_string())
            }
        );
    }

    #[tokio::test]
    async fn test_incumbent_bid_extends_expiry() {
        let clock = Arc::new(ManualClock::new());
        let store = MemoryStore::new(clock.clone());
        let a = host("host-a", 1);
        let elector_a = elector(&store, &clock, a.clone());

        elector_a.tick().await;
        assert_eq!(store.remaining_ttl(KEY), Some(Duration::from_secs(1)));

        elector_a.tick().await;
        assert_eq!(store.remaining_ttl(KEY), Some(Duration::from_secs(1)));
        assert_eq!(store.value(KEY), Some(a.to_string()));
    }

    #[tokio::test]
    async fn test_tick_sleeps_renew_interval_then_full_ttl_when_unreachable() {
        let clock = Arc::new(ManualClock::new());
        let store = MemoryStore::new(clock.clone());
        let elector_a = elector(&store, &clock, host("host-a", 1));

        assert_eq!(
            elector_a.tick().await,
            TickOutcome::Bid(BidOutcome::WonAsNew)
        );

        store.set_reachable(false);
        assert_eq!(elector_a.tick().await, TickOutcome::Unreachable);
        assert_eq!(elector_a.tick().await, TickOutcome::Unreachable);

        store.set_reachable(true);
        let outcome = elector_a.tick().await;
        // Two full TTLs passed, so the old lease is gone and this is a fresh win
        assert_eq!(outcome, TickOutcome::Bid(BidOutcome::WonAsNew));

        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_secs(4), TTL, TTL, Duration::from_secs(4)]
        );
    }

    #[tokio::test]
    async fn test_standby_never_overwrites_live_holder() {
        // Store time is stepped by hand so the two hosts interleave every 2s
        let store_clock = Arc::new(ManualClock::new());
        let store = MemoryStore::new(store_clock.clone());
        let sleeper = Arc::new(ManualClock::new());
        let a = host("host-a", 1);
        let elector_a = elector(&store, &sleeper, a.clone());
        let elector_b = elector(&store, &sleeper, host("host-b", 2));

        elector_a.tick().await;
        for _ in 0..10 {
            store_clock.advance(Duration::from_secs(2));
            assert_eq!(
                elector_b.tick().await,
                TickOutcome::Bid(BidOutcome::LostToOther {
                    holder: Some(a.to_string())
                })
            );
            store_clock.advance(Duration::from_secs(2));
            assert_eq!(
                elector_a.tick().await,
                TickOutcome::Bid(BidOutcome::ConfirmedIncumbent)
            );
        }
        assert_eq!(store.value(KEY), Some(a.to_string()));
    }

    #[tokio::test]
    async fn test_force_acquire_overwrites_holder() {
        let clock = Arc::new(ManualClock::new());
        let store = MemoryStore::new(clock.clone());
        let a = host("host-a", 1);
        let b = host("host-b", 2);
        store.insert(KEY, &a.to_string(), TTL);

        let elector_b = elector(&store, &clock, b.clone());
        assert_eq!(elector_b.force_acquire().await.unwrap(), b);
        assert_eq!(store.value(KEY), Some(b.to_string()));
        assert!(elector_b.query_is_primary().await.unwrap());
    }

    #[tokio::test]
    async fn test_query_propagates_store_failure() {
        let clock = Arc::new(ManualClock::new());
        let store = MemoryStore::new(clock.clone());
        store.set_reachable(false);

        let elector_a = elector(&store, &clock, host("host-a", 1));
        assert!(elector_a.query_is_primary().await.is_err());
        assert!(elector_a.force_acquire().await.is_err());
    }

    #[tokio::test]
    async fn test_signal_follows_primacy() {
        let temp_dir = create_temp_dir();
        let flag = temp_dir.path().join("primary");
        let clock = Arc::new(ManualClock::new());
        let store = MemoryStore::new(clock.clone());
        let a = host("host-a", 1);
        let b = host("host-b", 2);

        let elector_b =
            elector(&store, &clock, b.clone()).with_signal(PrimacySignal::new(&flag));

        elector_b.tick().await;
        assert!(flag.exists());

        store.insert(KEY, &a.to_string(), TTL);
        elector_b.tick().await;
        assert!(!flag.exists());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_signal_failure_does_not_affect_outcome() {
        let temp_dir = create_temp_dir();
        let flag = temp_dir.path().join("no-such-dir").join("primary");
        let clock = Arc::new(ManualClock::new());
        let store = MemoryStore::new(clock.clone());

        let elector_a =
            elector(&store, &clock, host("host-a", 1)).with_signal(PrimacySignal::new(&flag));

        assert_eq!(
            elector_a.tick().await,
            TickOutcome::Bid(BidOutcome::WonAsNew)
        );
        assert!(logs_contain("Could not update primacy flag"));
    }
}
