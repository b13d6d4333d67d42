//! Wiring from settings to the election and supervision components

use crate::cli::{Cli, Mode};
use crate::error::{CliError, CliResult};
use crate::exit_codes::{EXIT_ERROR, EXIT_SUCCESS};
use cron_ha_common::Pretty;
use cron_ha_config::{load_settings, Settings, StoreLocation};
use cron_ha_leader_election::{ElectionConfig, LeaderElector, PrimacySignal};
use cron_ha_store::{EndpointLocator, RedisConnector, SentinelLocator, StaticLocator};
use cron_ha_supervisor::{
    CommandSupervisor, ShellLauncher, SignalPlan, SupervisionOutcome, SupervisorConfig,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Run the selected mode and return the process exit code
pub async fn run(cli: Cli) -> CliResult<i32> {
    let mode = cli
        .mode()
        .ok_or_else(|| CliError::new("No mode selected", EXIT_ERROR))?;

    let settings = load_settings(&cli.config)
        .map_err(|e| CliError::from_error("Failed to load configuration", e))?;
    debug!("Effective settings: {}", Pretty(&settings));

    match mode {
        Mode::CycleForever => {
            build_elector(&settings)?.cycle_forever().await;
            Ok(EXIT_SUCCESS)
        }
        Mode::ForceAcquire => {
            let identity = build_elector(&settings)?
                .force_acquire()
                .await
                .map_err(|e| CliError::from_error("Failed to force primary lease", e))?;
            info!(%identity, "This host is now primary");
            Ok(EXIT_SUCCESS)
        }
        Mode::CheckIsPrimary => {
            let is_primary = build_elector(&settings)?
                .query_is_primary()
                .await
                .map_err(|e| CliError::from_error("Failed to query primary lease", e))?;
            let (answer, code) = primacy_report(is_primary);
            println!("{answer}");
            Ok(code)
        }
        Mode::Command { command, lock_key } => {
            run_command(&cli, &settings, &command, &lock_key).await
        }
    }
}

/// Printed answer and exit code for `--check-is-primary`
fn primacy_report(is_primary: bool) -> (&'static str, i32) {
    if is_primary {
        ("yes", EXIT_SUCCESS)
    } else {
        ("no", EXIT_ERROR)
    }
}

async fn run_command(
    cli: &Cli,
    settings: &Settings,
    command: &str,
    lock_key: &str,
) -> CliResult<i32> {
    // Checked before the store is touched
    let signals = SignalPlan::from_numbers(cli.stop_signal, cli.kill_signal)
        .map_err(|e| CliError::from_error("Invalid signal configuration", e))?;

    let config = SupervisorConfig::new(&settings.lock_key_prefix)
        .with_strict(cli.stop_command_on_lock_fail)
        .with_stop_timeout(Duration::from_secs(cli.stop_timeout_sec));
    let supervisor = CommandSupervisor::new(
        config,
        Arc::new(build_elector(settings)?),
        Arc::new(ShellLauncher::new(signals)),
    );

    let outcome = supervisor
        .run(command, lock_key)
        .await
        .map_err(|e| CliError::from_error("Failed to run command", e))?;
    if let SupervisionOutcome::Exited { status, escalation } = &outcome {
        debug!(%status, ?escalation, "Command outcome");
    }
    Ok(outcome.exit_code())
}

fn build_elector(settings: &Settings) -> CliResult<LeaderElector> {
    let location = settings
        .store_location()
        .map_err(|e| CliError::from_error("Invalid store location", e))?;
    let locator: Arc<dyn EndpointLocator> = match location {
        StoreLocation::Direct(endpoint) => Arc::new(StaticLocator::new(endpoint)),
        StoreLocation::Sentinel {
            sentinels,
            master_name,
        } => Arc::new(SentinelLocator::new(sentinels, master_name)),
    };
    let connector = RedisConnector::new(locator, settings.redis_db_num);

    let signal = settings
        .primary_flag_file
        .as_ref()
        .map(PrimacySignal::new)
        .unwrap_or_default();

    Ok(LeaderElector::new(
        ElectionConfig::new(&settings.server_key_name, settings.ttl()),
        Arc::new(connector),
    )
    .with_signal(signal))
}
