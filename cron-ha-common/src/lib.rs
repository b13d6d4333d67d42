//! Common types and utilities shared by the cron-ha crates
//!
//! - [`Endpoint`]: a `host:port` pair naming a store or sentinel node
//! - [`Clock`]: the sleep/now abstraction every control loop is driven by
//! - [`Pretty`]: YAML formatting for complex values in log lines

pub mod clock;
pub mod endpoint;
pub mod logging;

pub use clock::{Clock, TokioClock};
pub use endpoint::{Endpoint, EndpointParseError};
pub use logging::Pretty;
