//! Mutual exclusion, failover and query behaviour across several hosts

use cron_ha_leader_election::{
    BidOutcome, ElectionConfig, FixedIdentity, LeaderElector, SystemIdentity, TickOutcome,
};
use cron_ha_test_utils::{ManualClock, MemoryStore};
use futures::future::join_all;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use std::time::Duration;

const KEY: &str = "cron:server_name";
const TTL: Duration = Duration::from_secs(5);

fn host(index: u8) -> SystemIdentity {
    SystemIdentity::new(
        format!("host-{index}"),
        Ipv4Addr::new(10, 0, 0, index),
        Ipv6Addr::new(0xfd00, 0, 0, 0, 0, 0, 0, index as u16),
    )
}

fn elector_for(
    store: &MemoryStore,
    clock: Arc<ManualClock>,
    identity: SystemIdentity,
) -> LeaderElector {
    LeaderElector::new(ElectionConfig::new(KEY, TTL), Arc::new(store.clone()))
        .with_identity(Arc::new(FixedIdentity(identity)))
        .with_clock(clock)
}

#[tokio::test]
async fn test_simultaneous_bids_elect_exactly_one() {
    let store_clock = Arc::new(ManualClock::new());
    let store = MemoryStore::new(store_clock.clone());

    let electors: Vec<_> = (1..=8)
        .map(|i| elector_for(&store, Arc::new(ManualClock::new()), host(i)))
        .collect();

    let outcomes = join_all(electors.iter().map(|e| e.tick())).await;

    let winners: Vec<_> = outcomes
        .iter()
        .zip(1..=8u8)
        .filter(|(outcome, _)| matches!(outcome, TickOutcome::Bid(bid) if bid.is_primary()))
        .map(|(_, index)| host(index))
        .collect();
    assert_eq!(winners.len(), 1, "outcomes: {outcomes:?}");

    let stored = store.value(KEY).unwrap();
    assert_eq!(stored, winners[0].to_string());

    for outcome in outcomes {
        if let TickOutcome::Bid(BidOutcome::LostToOther { holder }) = outcome {
            assert_eq!(holder.as_deref(), Some(stored.as_str()));
        }
    }
}

#[tokio::test]
async fn test_two_hosts_loser_observes_winner() {
    let store_clock = Arc::new(ManualClock::new());
    let store = MemoryStore::new(store_clock.clone());
    let host_a = elector_for(&store, Arc::new(ManualClock::new()), host(1));
    let host_b = elector_for(&store, Arc::new(ManualClock::new()), host(2));

    let (a, b) = futures::join!(host_a.tick(), host_b.tick());
    let winner = store.value(KEY).unwrap();

    // Next cycle: the loser sees the winner and leaves the key alone
    store_clock.advance(Duration::from_secs(4));
    let (a2, b2) = futures::join!(host_a.tick(), host_b.tick());

    assert_eq!(store.value(KEY).unwrap(), winner);
    let primaries = [a, b, a2, b2]
        .iter()
        .filter(|o| matches!(o, TickOutcome::Bid(bid) if bid.is_primary()))
        .count();
    assert_eq!(primaries, 2, "winner holds both rounds, loser neither");
}

#[tokio::test]
async fn test_standby_takes_over_after_leader_stops() {
    let store_clock = Arc::new(ManualClock::new());
    let store = MemoryStore::new(store_clock.clone());
    let leader = elector_for(&store, store_clock.clone(), host(1));
    let standby = elector_for(&store, store_clock.clone(), host(2));

    assert_eq!(leader.tick().await, TickOutcome::Bid(BidOutcome::WonAsNew));
    let last_renewal = store_clock.elapsed() - leader.config().renew_interval();

    // The leader is gone; only the standby keeps ticking
    let mut takeover_at = None;
    for _ in 0..5 {
        let before = store_clock.elapsed();
        if standby.tick().await == TickOutcome::Bid(BidOutcome::WonAsNew) {
            takeover_at = Some(before);
            break;
        }
    }

    let takeover_at = takeover_at.expect("standby never took over");
    assert!(takeover_at - last_renewal >= TTL);
    assert!(takeover_at - last_renewal <= TTL + leader.config().renew_interval());
    assert_eq!(store.value(KEY), Some(host(2).to_string()));
}

#[tokio::test]
async fn test_bid_after_ttl_always_succeeds() {
    let store_clock = Arc::new(ManualClock::new());
    let store = MemoryStore::new(store_clock.clone());
    store.insert(KEY, &host(1).to_string(), TTL);

    let competitor = elector_for(&store, Arc::new(ManualClock::new()), host(2));

    store_clock.advance(TTL - Duration::from_millis(1));
    assert!(matches!(
        competitor.tick().await,
        TickOutcome::Bid(BidOutcome::LostToOther { .. })
    ));

    store_clock.advance(Duration::from_millis(2));
    assert_eq!(
        competitor.tick().await,
        TickOutcome::Bid(BidOutcome::WonAsNew)
    );
}

#[tokio::test]
async fn test_query_is_primary_tracks_stored_value() {
    let store_clock = Arc::new(ManualClock::new());
    let store = MemoryStore::new(store_clock.clone());
    let host_a = elector_for(&store, Arc::new(ManualClock::new()), host(1));

    assert!(!host_a.query_is_primary().await.unwrap());

    store.insert(KEY, &host(2).to_string(), TTL);
    assert!(!host_a.query_is_primary().await.unwrap());

    store.insert(KEY, &host(1).to_string(), TTL);
    assert!(host_a.query_is_primary().await.unwrap());

    store.insert(KEY, "garbage", TTL);
    assert!(!host_a.query_is_primary().await.unwrap());
}
