//! Test utilities for cron-ha crates
//!
//! - [`ManualClock`]: virtual time; sleeping advances it instantly
//! - [`MemoryStore`]: an in-memory lease store with TTL expiry against a clock,
//!   plus switches to simulate store outages
//!
//! ```no_run
//! use cron_ha_test_utils::{ManualClock, MemoryStore};
//! use std::sync::Arc;
//!
//! let clock = Arc::new(ManualClock::new());
//! let store = MemoryStore::new(clock.clone());
//! // Hand `store` to anything that wants a StoreConnector and `clock` to
//! // anything that wants a Clock.
//! ```

mod clock;
mod memory;

pub use clock::ManualClock;
pub use memory::MemoryStore;

use tempfile::TempDir;

/// Create a temporary directory with retry logic for parallel test execution
pub fn create_temp_dir_with_retry() -> std::io::Result<TempDir> {
    for attempt in 1..=3 {
        match TempDir::new() {
            Ok(dir) => return Ok(dir),
            Err(_e) if attempt < 3 => {
                std::thread::sleep(std::time::Duration::from_millis(10 * attempt as u64));
                continue;
            }
            Err(e) => return Err(e),
        }
    }
    unreachable!()
}

/// Create a temporary directory for testing (convenience function)
pub fn create_temp_dir() -> TempDir {
    create_temp_dir_with_retry()
        .expect("Failed to create temporary directory for test after 3 attempts")
}
