//! # cron-ha command supervision
//!
//! Runs a guarded shell command on the primary host only, holding a per-command
//! lock in the store for as long as the command runs.
//!
//! - **Primacy gate**: the command is never started unless this host holds the
//!   leadership lease
//! - **Deduplication**: an unexpired command lock means another run owns the
//!   command; this run is skipped
//! - **Renewal**: the lock TTL is refreshed on every supervision tick
//! - **Strict mode**: a single failed renewal stops the command, escalating from
//!   the stop signal to the kill signal after a timeout
//!
//! ```rust,ignore
//! use cron_ha_supervisor::{CommandSupervisor, ShellLauncher, SupervisorConfig};
//!
//! let supervisor = CommandSupervisor::new(config, elector, Arc::new(ShellLauncher::default()));
//! let outcome = supervisor.run("pg_dump main > /backup/main.sql", "backup").await?;
//! std::process::exit(outcome.exit_code());
//! ```

mod error;
mod process;
mod supervisor;

pub use error::{Result, SupervisorError};
pub use process::{
    ExitStatus, ManagedProcess, ProcessLauncher, ShellLauncher, ShellProcess, SignalPlan,
    WaitOutcome,
};
pub use supervisor::{
    CommandSupervisor, Escalation, SupervisionOutcome, SupervisorConfig, SupervisorState,
    DEFAULT_STOP_TIMEOUT,
};
