//! Error handling for the cron-ha CLI
//!
//! Library errors are wrapped into [`CliError`], which keeps the source chain
//! for logging and carries the exit code to use.

use std::error::Error;
use std::fmt;

use crate::exit_codes::EXIT_ERROR;

/// CLI-specific result type that preserves error information
pub type CliResult<T> = Result<T, CliError>;

/// CLI error type that includes both error information and suggested exit code
#[derive(Debug)]
pub struct CliError {
    pub message: String,
    pub exit_code: i32,
    pub source: Option<Box<dyn Error + Send + Sync>>,
}

impl CliError {
    /// Create a new CLI error with a message and exit code
    pub fn new(message: impl Into<String>, exit_code: i32) -> Self {
        Self {
            message: message.into(),
            exit_code,
            source: None,
        }
    }

    /// Wrap a library error under a short context message
    pub fn from_error(context: &str, error: impl Error + Send + Sync + 'static) -> Self {
        Self {
            message: context.to_string(),
            exit_code: EXIT_ERROR,
            source: Some(Box::new(error)),
        }
    }

    /// Get the full error chain as a formatted string
    pub fn full_chain(&self) -> String {
        let mut result = self.message.clone();

        let mut current_source = self.source();
        while let Some(err) = current_source {
            result.push_str(&format!("\n  Caused by: {err}"));
            current_source = err.source();
        }

        result
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}

/// Convert a CliResult to an exit code, logging the full error chain if needed
pub fn handle_cli_result(result: CliResult<i32>) -> i32 {
    match result {
        Ok(exit_code) => exit_code,
        Err(e) => {
            tracing::error!("Error: {}", e.full_chain());
            e.exit_code
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_full_chain_includes_sources() {
        let inner = io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused");
        let error = CliError::from_error("Failed to query primary lease", inner);

        assert_eq!(error.exit_code, EXIT_ERROR);
        assert_eq!(
            error.full_chain(),
            "Failed to query primary lease\n  Caused by: connection refused"
        );
    }

    #[test]
    fn test_handle_cli_result() {
        assert_eq!(handle_cli_result(Ok(7)), 7);
        assert_eq!(handle_cli_result(Err(CliError::new("boom", 3))), 3);
    }
}
