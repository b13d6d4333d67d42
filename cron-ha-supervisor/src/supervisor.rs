//! The command supervision state machine
//!
//! ```text
//! CheckingPrimacy --not primary--> Rejected
//!        |
//!   CheckingLock --lock held--> Skipped
//!        |
//!     Spawned --> Running <--> Renewing
//!                    |            |
//!                 Exited      Stopping (strict) --> Killing --> Exited
//! ```

use crate::process::{ExitStatus, ManagedProcess, ProcessLauncher, WaitOutcome};
use crate::Result;
use cron_ha_leader_election::{LeaderElector, SystemIdentity};
use cron_ha_store::{LeaseStore, StoreError};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default grace period between the stop and kill signals
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(1);

/// Supervision settings for guarded commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// Prepended to the caller's lock key
    pub lock_key_prefix: String,
    /// Stop the command on the first failed lock renewal
    pub strict: bool,
    /// How long the command gets to exit after the stop signal
    pub stop_timeout: Duration,
}

impl SupervisorConfig {
    pub fn new(lock_key_prefix: impl Into<String>) -> Self {
        Self {
            lock_key_prefix: lock_key_prefix.into(),
            strict: false,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_stop_timeout(mut self, stop_timeout: Duration) -> Self {
        self.stop_timeout = stop_timeout;
        self
    }

    /// Store key for a caller-supplied lock key
    pub fn lock_key(&self, lock_key: &str) -> String {
        format!("{}{}", self.lock_key_prefix, lock_key)
    }
}

/// Where a supervision run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    CheckingPrimacy,
    Rejected,
    CheckingLock,
    Skipped,
    Spawned,
    Running,
    Renewing,
    Stopping,
    Killing,
    Exited,
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SupervisorState::CheckingPrimacy => "checking-primacy",
            SupervisorState::Rejected => "rejected",
            SupervisorState::CheckingLock => "checking-lock",
            SupervisorState::Skipped => "skipped",
            SupervisorState::Spawned => "spawned",
            SupervisorState::Running => "running",
            SupervisorState::Renewing => "renewing",
            SupervisorState::Stopping => "stopping",
            SupervisorState::Killing => "killing",
            SupervisorState::Exited => "exited",
        };
        f.write_str(name)
    }
}

/// Which signal finally ended a command stopped after lock loss
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    /// The stop signal was enough
    Terminated,
    /// The command outlived the stop timeout and got the kill signal
    Killed,
}

/// How a supervision run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisionOutcome {
    /// This host is not the primary; the command never ran
    Rejected,
    /// Another run holds the command lock; the command never ran
    Skipped { holder: String },
    /// The command ran and exited
    Exited {
        status: ExitStatus,
        escalation: Option<Escalation>,
    },
}

impl SupervisionOutcome {
    /// Process exit code for this outcome
    pub fn exit_code(&self) -> i32 {
        match self {
            SupervisionOutcome::Rejected => 1,
            SupervisionOutcome::Skipped { .. } => 0,
            SupervisionOutcome::Exited { status, .. } => status.exit_code(),
        }
    }
}

enum Start {
    Finished(SupervisionOutcome),
    Spawned {
        process: Box<dyn ManagedProcess>,
        lock_written: std::result::Result<(), StoreError>,
    },
}

#[derive(Debug, PartialEq, Eq)]
enum LockRenewal {
    Refreshed,
    Reinstated,
    HeldByOther(String),
}

/// Runs one guarded command to completion
pub struct CommandSupervisor {
    config: SupervisorConfig,
    elector: Arc<LeaderElector>,
    launcher: Arc<dyn ProcessLauncher>,
}

impl CommandSupervisor {
    pub fn new(
        config: SupervisorConfig,
        elector: Arc<LeaderElector>,
        launcher: Arc<dyn ProcessLauncher>,
    ) -> Self {
        Self {
            config,
            elector,
            launcher,
        }
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Run `command` if this host is primary and no other run holds `lock_key`
    ///
    /// Store failures before the command starts are returned as errors. Once
    /// the command runs, store failures only matter in strict mode, where they
    /// stop it.
    pub async fn run(&self, command: &str, lock_key: &str) -> Result<SupervisionOutcome> {
        let identity = self.elector.resolve_identity();
        let lock_key = self.config.lock_key(lock_key);

        let mut store = self.elector.connector().connect().await?;
        let started = self
            .start(store.as_mut(), &identity, &lock_key, command)
            .await;
        store.close();

        let (mut process, lock_written) = match started? {
            Start::Finished(outcome) => return Ok(outcome),
            Start::Spawned {
                process,
                lock_written,
            } => (process, lock_written),
        };

        if let Err(e) = lock_written {
            if let Some(outcome) = self
                .on_lock_failure(process.as_mut(), &lock_key, &e.to_string())
                .await?
            {
                return Ok(outcome);
            }
        }

        self.supervise(process.as_mut(), &identity, &lock_key).await
    }

    async fn start(
        &self,
        store: &mut dyn LeaseStore,
        identity: &SystemIdentity,
        lock_key: &str,
        command: &str,
    ) -> Result<Start> {
        enter(SupervisorState::CheckingPrimacy);
        if !self.elector.is_primary_on(store, identity).await? {
            enter(SupervisorState::Rejected);
            warn!(%identity, "Refusing to run command: this host is not the primary");
            return Ok(Start::Finished(SupervisionOutcome::Rejected));
        }

        enter(SupervisorState::CheckingLock);
        if let Some(holder) = store.get(lock_key).await? {
            enter(SupervisorState::Skipped);
            info!(lock_key, %holder, "Command already running elsewhere, skipping");
            return Ok(Start::Finished(SupervisionOutcome::Skipped { holder }));
        }

        let process = self.launcher.launch(command)?;
        enter(SupervisorState::Spawned);
        info!(pid = ?process.id(), lock_key, "Started command");

        let lock_written = store
            .force_set(lock_key, &identity.to_string(), self.ttl())
            .await;
        Ok(Start::Spawned {
            process,
            lock_written,
        })
    }

    async fn supervise(
        &self,
        process: &mut dyn ManagedProcess,
        identity: &SystemIdentity,
        lock_key: &str,
    ) -> Result<SupervisionOutcome> {
        let interval = self.elector.config().renew_interval();

        loop {
            enter(SupervisorState::Running);
            if let Some(status) = process.try_wait()? {
                enter(SupervisorState::Exited);
                info!(%status, "Command finished");
                return Ok(SupervisionOutcome::Exited {
                    status,
                    escalation: None,
                });
            }

            enter(SupervisorState::Renewing);
            let failure = match self.renew_lock(identity, lock_key).await {
                Ok(LockRenewal::Refreshed) => None,
                Ok(LockRenewal::Reinstated) => {
                    warn!(lock_key, "Command lock had expired, reinstated it");
                    None
                }
                Ok(LockRenewal::HeldByOther(holder)) => Some(format!("lock taken by {holder}")),
                Err(e) => Some(e.to_string()),
            };

            if let Some(reason) = failure {
                if let Some(outcome) = self.on_lock_failure(process, lock_key, &reason).await? {
                    return Ok(outcome);
                }
            }

            self.elector.clock().sleep(interval).await;
        }
    }

    /// Stop the command in strict mode; otherwise log and keep going
    async fn on_lock_failure(
        &self,
        process: &mut dyn ManagedProcess,
        lock_key: &str,
        reason: &str,
    ) -> Result<Option<SupervisionOutcome>> {
        if !self.config.strict {
            warn!(lock_key, reason, "Failed to renew command lock, command keeps running");
            return Ok(None);
        }

        warn!(lock_key, reason, "Failed to renew command lock, stopping command");
        self.stop(process).await.map(Some)
    }

    async fn stop(&self, process: &mut dyn ManagedProcess) -> Result<SupervisionOutcome> {
        enter(SupervisorState::Stopping);
        process.terminate()?;

        let (status, escalation) = match process
            .wait_with_timeout(self.config.stop_timeout)
            .await?
        {
            WaitOutcome::Exited(status) => (status, Escalation::Terminated),
            WaitOutcome::TimedOut => {
                enter(SupervisorState::Killing);
                warn!(
                    pid = ?process.id(),
                    "Command still running {:?} after stop signal, killing it",
                    self.config.stop_timeout
                );
                process.force_kill()?;
                (process.wait().await?, Escalation::Killed)
            }
        };

        enter(SupervisorState::Exited);
        info!(%status, ?escalation, "Command stopped after losing its lock");
        Ok(SupervisionOutcome::Exited {
            status,
            escalation: Some(escalation),
        })
    }

    async fn renew_lock(
        &self,
        identity: &SystemIdentity,
        lock_key: &str,
    ) -> std::result::Result<LockRenewal, StoreError> {
        let mut store = self.elector.connector().connect().await?;
        let result = renew_on(store.as_mut(), identity, lock_key, self.ttl()).await;
        store.close();
        result
    }

    fn ttl(&self) -> Duration {
        self.elector.config().ttl
    }
}

async fn renew_on(
    store: &mut dyn LeaseStore,
    identity: &SystemIdentity,
    lock_key: &str,
    ttl: Duration,
) -> std::result::Result<LockRenewal, StoreError> {
    match store.get(lock_key).await? {
        Some(holder) if identity.matches(&holder) => {
            if store.refresh_ttl(lock_key, ttl).await? {
                Ok(LockRenewal::Refreshed)
            } else {
                store.force_set(lock_key, &identity.to_string(), ttl).await?;
                Ok(LockRenewal::Reinstated)
            }
        }
        Some(holder) => Ok(LockRenewal::HeldByOther(holder)),
        None => {
            store.force_set(lock_key, &identity.to_string(), ttl).await?;
            Ok(LockRenewal::Reinstated)
        }
    }
}

fn enter(state: SupervisorState) {
    debug!(%state, "Supervisor state");
}
