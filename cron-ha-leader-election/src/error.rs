//! Error types for leader election

use cron_ha_store::StoreError;

/// Errors that can occur during leader election
#[derive(Debug, thiserror::Error)]
pub enum ElectionError {
    /// The store could not be reached or did not answer
    #[error("Lease store unavailable: {0}")]
    Store(#[from] StoreError),
}

/// Result type for election operations
pub type Result<T> = std::result::Result<T, ElectionError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_election_error_display() {
        let err = ElectionError::from(StoreError::Unreachable("offline".to_string()));
        assert_eq!(
            format!("{}", err),
            "Lease store unavailable: Store unreachable: offline"
        );
    }

    #[test]
    fn test_election_error_source() {
        let err = ElectionError::from(StoreError::Unreachable("offline".to_string()));
        assert!(err.source().is_some());
    }
}
