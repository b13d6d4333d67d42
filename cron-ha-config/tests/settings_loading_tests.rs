//! End-to-end loading of realistic configuration files

use cron_ha_common::Endpoint;
use cron_ha_config::{load_settings, StoreLocation};
use serial_test::serial;
use std::fs;
use tempfile::TempDir;

#[test]
#[serial]
fn test_sentinel_deployment_config() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("cron-ha.yml");
    fs::write(
        &path,
        r#"
sentinels:
  - 10.0.0.1:26379
  - "[fd00::2]:26379"
sentinel_master_name: cron
redis_db_num: 3
timeout_sec: 10
server_key_name: "jobs:primary"
lock_key_prefix: "jobs:lock:"
"#,
    )
    .unwrap();

    let settings = load_settings(&path).unwrap();

    assert_eq!(settings.redis_db_num, 3);
    assert_eq!(settings.server_key_name, "jobs:primary");
    assert_eq!(settings.lock_key_prefix, "jobs:lock:");
    assert_eq!(
        settings.store_location().unwrap(),
        StoreLocation::Sentinel {
            sentinels: vec![
                Endpoint::new("10.0.0.1", 26379),
                Endpoint::new("fd00::2", 26379),
            ],
            master_name: "cron".to_string(),
        }
    );
}

#[test]
#[serial]
fn test_malformed_yaml_reports_parse_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("cron-ha.yml");
    fs::write(&path, "sentinels: [10.0.0.1:26379\n").unwrap();

    let err = load_settings(&path).unwrap_err();
    assert!(
        err.to_string().contains("Failed to parse configuration"),
        "unexpected error: {err}"
    );
}
