//! In-memory lease store

use async_trait::async_trait;
use cron_ha_common::Clock;
use cron_ha_store::{LeaseStore, Result, SetOutcome, StoreConnector, StoreError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

#[derive(Debug)]
struct State {
    entries: HashMap<String, Entry>,
    reachable: bool,
    failing_refreshes: bool,
    connects: usize,
}

/// Shared in-memory store with TTL expiry
///
/// Cloning yields another handle onto the same data, so several electors or
/// supervisors can compete over one store. Every operation holds a single
/// mutex, which makes the conditional set atomic.
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                entries: HashMap::new(),
                reachable: true,
                failing_refreshes: false,
                connects: 0,
            })),
            clock,
        }
    }

    /// Simulate the store going down or coming back
    pub fn set_reachable(&self, reachable: bool) {
        self.state.lock().unwrap().reachable = reachable;
    }

    /// Make every TTL refresh fail while other commands keep working
    pub fn fail_refreshes(&self, failing: bool) {
        self.state.lock().unwrap().failing_refreshes = failing;
    }

    /// Number of successful connects so far
    pub fn connect_count(&self) -> usize {
        self.state.lock().unwrap().connects
    }

    /// Current unexpired value of `key`
    pub fn value(&self, key: &str) -> Option<String> {
        let now = self.clock.now();
        let mut state = self.state.lock().unwrap();
        live_entry(&mut state, key, now).map(|e| e.value.clone())
    }

    /// Remaining lifetime of `key`
    pub fn remaining_ttl(&self, key: &str) -> Option<Duration> {
        let now = self.clock.now();
        let mut state = self.state.lock().unwrap();
        live_entry(&mut state, key, now).map(|e| e.expires_at - now)
    }

    /// Seed a key directly, bypassing connectivity switches
    pub fn insert(&self, key: &str, value: &str, ttl: Duration) {
        let expires_at = self.clock.now() + ttl;
        self.state.lock().unwrap().entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut State, Instant) -> Result<T>) -> Result<T> {
        let now = self.clock.now();
        let mut state = self.state.lock().unwrap();
        if !state.reachable {
            return Err(StoreError::Unreachable("memory store offline".to_string()));
        }
        f(&mut state, now)
    }
}

fn live_entry<'a>(state: &'a mut State, key: &str, now: Instant) -> Option<&'a Entry> {
    if state
        .entries
        .get(key)
        .is_some_and(|entry| entry.expires_at <= now)
    {
        state.entries.remove(key);
    }
    state.entries.get(key)
}

#[async_trait]
impl StoreConnector for MemoryStore {
    async fn connect(&self) -> Result<Box<dyn LeaseStore>> {
        self.with_state(|state, _| {
            state.connects += 1;
            Ok(())
        })?;
        Ok(Box::new(MemoryConnection {
            store: self.clone(),
        }))
    }
}

struct MemoryConnection {
    store: MemoryStore,
}

#[async_trait]
impl LeaseStore for MemoryConnection {
    async fn set_if_absent(
        &mut self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<SetOutcome> {
        self.store.with_state(|state, now| {
            let written = live_entry(state, key, now).is_none();
            if written {
                state.entries.insert(
                    key.to_string(),
                    Entry {
                        value: value.to_string(),
                        expires_at: now + ttl,
                    },
                );
            }
            Ok(SetOutcome {
                written,
                current: live_entry(state, key, now).map(|e| e.value.clone()),
            })
        })
    }

    async fn force_set(&mut self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.store.with_state(|state, now| {
            state.entries.insert(
                key.to_string(),
                Entry {
                    value: value.to_string(),
                    expires_at: now + ttl,
                },
            );
            Ok(())
        })
    }

    async fn get(&mut self, key: &str) -> Result<Option<String>> {
        self.store
            .with_state(|state, now| Ok(live_entry(state, key, now).map(|e| e.value.clone())))
    }

    async fn refresh_ttl(&mut self, key: &str, ttl: Duration) -> Result<bool> {
        self.store.with_state(|state, now| {
            if state.failing_refreshes {
                return Err(StoreError::Unreachable(format!(
                    "refresh of {key} dropped"
                )));
            }
            live_entry(state, key, now);
            match state.entries.get_mut(key) {
                Some(entry) => {
                    entry.expires_at = now + ttl;
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }
}
