//! Error types for command supervision

use cron_ha_leader_election::ElectionError;
use cron_ha_store::StoreError;
use nix::sys::signal::Signal;
use std::io;

/// Errors that end a supervision run without a child exit status
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    /// The store was unreachable before the command started
    #[error("Lease store unavailable: {0}")]
    Store(#[from] StoreError),

    /// The primacy check failed
    #[error(transparent)]
    Election(#[from] ElectionError),

    /// The command could not be started
    #[error("Failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// Waiting on the child failed
    #[error("Failed to wait for command: {0}")]
    Wait(#[source] io::Error),

    /// A signal could not be delivered
    #[error("Failed to send {signal} to command: {source}")]
    Signal {
        signal: Signal,
        #[source]
        source: nix::Error,
    },

    /// A configured signal number is not a valid signal
    #[error("Invalid signal number {0}")]
    InvalidSignal(i32),
}

/// Result type for supervision operations
pub type Result<T> = std::result::Result<T, SupervisorError>;
