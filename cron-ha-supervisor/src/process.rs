//! Child process handling
//!
//! [`ManagedProcess`] is the seam between the supervisor's state machine and
//! the operating system. [`ShellProcess`] runs the command through `sh -c`
//! and delivers signals with `kill(2)`.

use crate::{Result, SupervisorError};
use async_trait::async_trait;
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::fmt;
use std::os::unix::process::ExitStatusExt;
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::debug;

/// How a child process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus {
    /// Exit code, if the process exited normally
    pub code: Option<i32>,
    /// Terminating signal number, if a signal ended it
    pub signal: Option<i32>,
}

impl ExitStatus {
    pub fn exited(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    pub fn signaled(signal: i32) -> Self {
        Self {
            code: None,
            signal: Some(signal),
        }
    }

    /// Exit code to report for this status
    ///
    /// A signal-terminated child follows the shell convention `128 + signal`.
    pub fn exit_code(&self) -> i32 {
        match (self.code, self.signal) {
            (Some(code), _) => code,
            (None, Some(signal)) => 128 + signal,
            (None, None) => 1,
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    fn signal_name(&self) -> Option<String> {
        let signal = self.signal?;
        Some(match Signal::try_from(signal) {
            Ok(sig) => sig.as_str().to_string(),
            Err(_) => format!("signal {signal}"),
        })
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
            signal: status.signal(),
        }
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal_name()) {
            (Some(code), _) => write!(f, "exit code {code}"),
            (None, Some(name)) => write!(f, "killed by {name}"),
            (None, None) => write!(f, "unknown status"),
        }
    }
}

/// Result of a bounded wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Exited(ExitStatus),
    TimedOut,
}

/// A running child the supervisor can poll and stop
#[async_trait]
pub trait ManagedProcess: Send {
    /// OS process id, if still known
    fn id(&self) -> Option<u32>;

    /// Non-blocking exit check
    fn try_wait(&mut self) -> Result<Option<ExitStatus>>;

    /// Send the configured stop signal
    fn terminate(&mut self) -> Result<()>;

    /// Send the configured kill signal
    fn force_kill(&mut self) -> Result<()>;

    /// Wait for exit, giving up after `timeout`
    async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<WaitOutcome>;

    /// Wait for exit with no bound
    async fn wait(&mut self) -> Result<ExitStatus>;
}

/// Starts guarded commands
pub trait ProcessLauncher: Send + Sync {
    fn launch(&self, command: &str) -> Result<Box<dyn ManagedProcess>>;
}

/// Signals used to stop a command, in escalation order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalPlan {
    pub stop: Signal,
    pub kill: Signal,
}

impl SignalPlan {
    /// Build a plan from raw signal numbers, rejecting unknown ones
    pub fn from_numbers(stop: i32, kill: i32) -> Result<Self> {
        let parse =
            |number| Signal::try_from(number).map_err(|_| SupervisorError::InvalidSignal(number));
        Ok(Self {
            stop: parse(stop)?,
            kill: parse(kill)?,
        })
    }
}

impl Default for SignalPlan {
    fn default() -> Self {
        Self {
            stop: Signal::SIGTERM,
            kill: Signal::SIGKILL,
        }
    }
}

/// Launches commands through `/bin/sh -c`
///
/// The child inherits stdin, stdout and stderr.
#[derive(Debug, Clone)]
pub struct ShellLauncher {
    shell: String,
    signals: SignalPlan,
}

impl ShellLauncher {
    pub fn new(signals: SignalPlan) -> Self {
        Self {
            shell: "/bin/sh".to_string(),
            signals,
        }
    }

    pub fn signals(&self) -> SignalPlan {
        self.signals
    }
}

impl Default for ShellLauncher {
    fn default() -> Self {
        Self::new(SignalPlan::default())
    }
}

impl ProcessLauncher for ShellLauncher {
    fn launch(&self, command: &str) -> Result<Box<dyn ManagedProcess>> {
        let child = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .spawn()
            .map_err(|source| SupervisorError::Spawn {
                command: command.to_string(),
                source,
            })?;

        debug!(pid = ?child.id(), command, "Spawned command");
        Ok(Box::new(ShellProcess {
            child,
            signals: self.signals,
        }))
    }
}

/// A command running under `sh -c`
#[derive(Debug)]
pub struct ShellProcess {
    child: Child,
    signals: SignalPlan,
}

impl ShellProcess {
    fn send(&self, signal: Signal) -> Result<()> {
        // No pid means the child was already reaped
        let Some(pid) = self.child.id() else {
            return Ok(());
        };

        debug!(pid, %signal, "Signalling command");
        match kill(Pid::from_raw(pid as i32), signal) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(source) => Err(SupervisorError::Signal { signal, source }),
        }
    }
}

#[async_trait]
impl ManagedProcess for ShellProcess {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    fn try_wait(&mut self) -> Result<Option<ExitStatus>> {
        self.child
            .try_wait()
            .map(|status| status.map(ExitStatus::from))
            .map_err(SupervisorError::Wait)
    }

    fn terminate(&mut self) -> Result<()> {
        self.send(self.signals.stop)
    }

    fn force_kill(&mut self) -> Result<()> {
        self.send(self.signals.kill)
    }

    async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<WaitOutcome> {
        match tokio::time::timeout(timeout, self.child.wait()).await {
            Ok(status) => Ok(WaitOutcome::Exited(
                status.map_err(SupervisorError::Wait)?.into(),
            )),
            Err(_) => Ok(WaitOutcome::TimedOut),
        }
    }

    async fn wait(&mut self) -> Result<ExitStatus> {
        let status = self.child.wait().await.map_err(SupervisorError::Wait)?;
        Ok(status.into())
    }
}
