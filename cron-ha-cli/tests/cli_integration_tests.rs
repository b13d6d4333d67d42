use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Config pointing at a port nothing listens on
fn unreachable_config(temp_dir: &TempDir) -> PathBuf {
    let path = temp_dir.path().join("cron-ha.yml");
    fs::write(&path, "redis: 127.0.0.1:1\ntimeout_sec: 1\n").unwrap();
    path
}

/// Config for the local Redis on 127.0.0.1:6379, db 15, with a fresh primary key
fn local_redis_config(temp_dir: &TempDir, name: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let path = temp_dir.path().join("cron-ha.yml");
    fs::write(
        &path,
        format!(
            "redis: 127.0.0.1:6379\nredis_db_num: 15\ntimeout_sec: 5\n\
             server_key_name: \"cron-ha-test:{name}:{nanos}\"\n"
        ),
    )
    .unwrap();
    path
}

fn cron_ha() -> Command {
    let mut cmd = Command::cargo_bin("cron-ha").unwrap();
    cmd.env_remove("CRON_HA_REDIS")
        .env_remove("CRON_HA_SENTINELS")
        .env_remove("CRON_HA_TIMEOUT_SEC");
    cmd
}

#[test]
fn test_help_lists_modes() {
    cron_ha()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--cycle-try-get-primary-lock"))
        .stdout(predicate::str::contains("--check-is-primary"))
        .stdout(predicate::str::contains("--stop-command-on-lock-fail"));
}

#[test]
fn test_version_exits_zero() {
    cron_ha()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("cron-ha"));
}

#[test]
fn test_missing_mode_exits_one() {
    cron_ha()
        .assert()
        .code(1)
        .stderr(predicate::str::contains("required"));
}

#[test]
fn test_two_modes_exit_one() {
    cron_ha()
        .args(["--check-is-primary", "--force-get-primary-lock"])
        .assert()
        .code(1);
}

#[test]
fn test_missing_config_file_exits_one() {
    let temp_dir = TempDir::new().unwrap();

    cron_ha()
        .arg("--config")
        .arg(temp_dir.path().join("absent.yml"))
        .arg("--check-is-primary")
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("absent.yml"));
}

#[test]
fn test_invalid_config_value_exits_one() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("cron-ha.yml");
    fs::write(&path, "timeout_sec: 0\n").unwrap();

    cron_ha()
        .arg("--config")
        .arg(&path)
        .arg("--check-is-primary")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("timeout_sec"));
}

#[test]
fn test_check_is_primary_with_store_down_exits_one() {
    let temp_dir = TempDir::new().unwrap();
    let config = unreachable_config(&temp_dir);

    cron_ha()
        .arg("--config")
        .arg(&config)
        .arg("--check-is-primary")
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_command_never_runs_when_store_down() {
    let temp_dir = TempDir::new().unwrap();
    let config = unreachable_config(&temp_dir);
    let marker = temp_dir.path().join("ran");

    cron_ha()
        .arg("--config")
        .arg(&config)
        .arg("--command")
        .arg(format!("touch {}", marker.display()))
        .args(["--lock-key", "marker"])
        .assert()
        .code(1);

    assert!(!marker.exists());
}

#[test]
fn test_invalid_signal_rejected_before_store_access() {
    let temp_dir = TempDir::new().unwrap();
    let config = unreachable_config(&temp_dir);

    cron_ha()
        .arg("--config")
        .arg(&config)
        .args(["--command", "true", "--lock-key", "noop", "--stop-signal", "999"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid signal"));
}

#[test]
fn test_force_get_primary_lock_with_store_down_exits_one() {
    let temp_dir = TempDir::new().unwrap();
    let config = unreachable_config(&temp_dir);

    cron_ha()
        .arg("--config")
        .arg(&config)
        .arg("--force-get-primary-lock")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to force primary lease"));
}

#[test]
#[ignore = "requires a Redis server on 127.0.0.1:6379"]
fn test_check_is_primary_says_yes_after_force() {
    let temp_dir = TempDir::new().unwrap();
    let config = local_redis_config(&temp_dir, "force-then-check");

    cron_ha()
        .arg("--config")
        .arg(&config)
        .arg("--force-get-primary-lock")
        .assert()
        .success();

    cron_ha()
        .arg("--config")
        .arg(&config)
        .arg("--check-is-primary")
        .assert()
        .success()
        .stdout("yes\n");
}

#[test]
#[ignore = "requires a Redis server on 127.0.0.1:6379"]
fn test_check_is_primary_says_no_without_lease() {
    let temp_dir = TempDir::new().unwrap();
    let config = local_redis_config(&temp_dir, "no-lease");

    cron_ha()
        .arg("--config")
        .arg(&config)
        .arg("--check-is-primary")
        .assert()
        .code(1)
        .stdout("no\n");
}
