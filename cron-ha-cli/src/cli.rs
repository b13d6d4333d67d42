use clap::{ArgGroup, Parser};
use cron_ha_config::DEFAULT_CONFIG_FILE;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cron-ha")]
#[command(version)]
#[command(about = "Run cron jobs on exactly one host, with automatic failover")]
#[command(long_about = "
cron-ha elects one primary host through a lease held in Redis and runs guarded
cron commands only there. Every host runs the election loop; cron entries wrap
their commands with --command so that only the primary executes them, and only
once at a time.

Exactly one mode must be given.

Example usage:
  cron-ha --cycle-try-get-primary-lock                      # election daemon
  cron-ha --check-is-primary                                 # prints yes or no
  cron-ha --command 'backup.sh' --lock-key backup            # guarded command
  cron-ha --command 'sync.sh' --lock-key sync --stop-command-on-lock-fail
")]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args([
            "cycle_try_get_primary_lock",
            "force_get_primary_lock",
            "check_is_primary",
            "command",
        ])
))]
pub struct Cli {
    /// Configuration file in YAML format
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Enable debug logging
    #[arg(long, conflicts_with = "quiet")]
    pub debug: bool,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Run forever, taking and renewing the primary lease whenever possible
    #[arg(long, visible_alias = "hold-primary-lock")]
    pub cycle_try_get_primary_lock: bool,

    /// Take the primary lease unconditionally, for manual failover
    #[arg(long)]
    pub force_get_primary_lock: bool,

    /// Print yes and exit 0 if this host is primary, otherwise print no and exit 1
    #[arg(long)]
    pub check_is_primary: bool,

    /// Shell command to run on the primary; the exit code is the command's
    #[arg(long, value_name = "CMD", requires = "lock_key")]
    pub command: Option<String>,

    /// Unique key for this command's lock
    #[arg(long, value_name = "KEY", requires = "command")]
    pub lock_key: Option<String>,

    /// Stop the command as soon as its lock cannot be renewed
    #[arg(long, requires = "command")]
    pub stop_command_on_lock_fail: bool,

    /// Signal number sent first when stopping the command
    #[arg(long, value_name = "N", default_value_t = 15, requires = "command")]
    pub stop_signal: i32,

    /// Signal number sent when the command outlives --stop-timeout-sec
    #[arg(long, value_name = "N", default_value_t = 9, requires = "command")]
    pub kill_signal: i32,

    /// Seconds to wait between the stop and kill signals
    #[arg(long, value_name = "SECS", default_value_t = 1, requires = "command")]
    pub stop_timeout_sec: u64,
}

/// The one operation selected on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    CycleForever,
    ForceAcquire,
    CheckIsPrimary,
    Command { command: String, lock_key: String },
}

impl Cli {
    /// Selected mode; `None` only if clap's group validation was bypassed
    pub fn mode(&self) -> Option<Mode> {
        if self.cycle_try_get_primary_lock {
            return Some(Mode::CycleForever);
        }
        if self.force_get_primary_lock {
            return Some(Mode::ForceAcquire);
        }
        if self.check_is_primary {
            return Some(Mode::CheckIsPrimary);
        }
        match (&self.command, &self.lock_key) {
            (Some(command), Some(lock_key)) => Some(Mode::Command {
                command: command.clone(),
                lock_key: lock_key.clone(),
            }),
            _ => None,
        }
    }
}
