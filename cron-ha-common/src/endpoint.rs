//! Network endpoint value type

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced while parsing a `host:port` string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointParseError {
    /// No `:port` suffix was found
    #[error("endpoint '{0}' is missing a ':port' suffix")]
    MissingPort(String),

    /// The port is not a valid u16
    #[error("endpoint '{input}' has an invalid port '{port}'")]
    InvalidPort { input: String, port: String },

    /// The host part is empty
    #[error("endpoint '{0}' has an empty host")]
    EmptyHost(String),

    /// An opening bracket was not closed
    #[error("endpoint '{0}' has an unterminated IPv6 bracket")]
    UnterminatedBracket(String),
}

/// A `host:port` pair
///
/// IPv6 hosts may be written bracketed (`[::1]:6379` or `{::1}:6379`). Without
/// brackets the last colon separates the port, so `::1:6379` also parses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    /// Create an endpoint from its parts
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl FromStr for Endpoint {
    type Err = EndpointParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();

        let (host, port) = match trimmed.chars().next() {
            Some(open @ ('[' | '{')) => {
                let close = if open == '[' { ']' } else { '}' };
                let end = trimmed
                    .find(close)
                    .ok_or_else(|| EndpointParseError::UnterminatedBracket(input.to_string()))?;
                let rest = &trimmed[end + 1..];
                let port = rest
                    .strip_prefix(':')
                    .ok_or_else(|| EndpointParseError::MissingPort(input.to_string()))?;
                (&trimmed[1..end], port)
            }
            _ => trimmed
                .rsplit_once(':')
                .ok_or_else(|| EndpointParseError::MissingPort(input.to_string()))?,
        };

        if host.is_empty() {
            return Err(EndpointParseError::EmptyHost(input.to_string()));
        }

        let port = port
            .parse::<u16>()
            .map_err(|_| EndpointParseError::InvalidPort {
                input: input.to_string(),
                port: port.to_string(),
            })?;

        Ok(Self::new(host, port))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
