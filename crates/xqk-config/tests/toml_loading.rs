//! Integration tests for TOML configuration loading.
//!
//! Uses figment::Jail for safe, sandboxed env var and working-directory manipulation.

use std::path::Path;
use std::time::Duration;

use figment::Jail;
use pretty_assertions::assert_eq;
use xqk_config::{ConfigError, LogFormat, XqkConfig};

#[test]
fn loads_local_config_file() {
    Jail::expect_with(|jail| {
        let dir = jail.directory().display().to_string();
        jail.set_env("XDG_CONFIG_HOME", dir);
        jail.create_file(
            "xfs-quota-kit.toml",
            r#"
[xfs]
default_path = "/srv/xfs"
projects_file = "/srv/etc/projects"
projid_file = "/srv/etc/projid"
first_project_id = 5000
auto_create = false

[xfs.default_limits]
user_block_soft = "512MB"
user_block_hard = "1GB"

[monitor]
interval = "90s"
alert_threshold = 95

[logging]
level = "debug"
format = "json"
"#,
        )?;

        let config = XqkConfig::load(None).expect("config loads");
        assert_eq!(config.xfs.default_path, "/srv/xfs");
        assert_eq!(config.xfs.projects_file, "/srv/etc/projects");
        assert_eq!(config.xfs.first_project_id, 5000);
        assert!(!config.xfs.auto_create);
        assert_eq!(config.xfs.default_limits.user_block_soft, "512MB");
        // Unspecified keys in a partially-specified table keep their defaults.
        assert_eq!(config.xfs.default_limits.group_block_hard, "20GB");
        assert_eq!(config.xfs.mounts_file, "/proc/self/mounts");
        assert_eq!(config.monitor.interval, Duration::from_secs(90));
        assert_eq!(config.monitor.alert_threshold, 95);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        Ok(())
    });
}

#[test]
fn explicit_file_beats_local_file() {
    Jail::expect_with(|jail| {
        let dir = jail.directory().display().to_string();
        jail.set_env("XDG_CONFIG_HOME", dir);
        jail.create_file("xfs-quota-kit.toml", "[xfs]\ndefault_path = \"/local\"\n")?;
        jail.create_file("explicit.toml", "[xfs]\ndefault_path = \"/explicit\"\n")?;

        let config = XqkConfig::load(Some(Path::new("explicit.toml"))).expect("config loads");
        assert_eq!(config.xfs.default_path, "/explicit");
        Ok(())
    });
}

#[test]
fn invalid_values_fail_validation() {
    Jail::expect_with(|jail| {
        let dir = jail.directory().display().to_string();
        jail.set_env("XDG_CONFIG_HOME", dir);
        jail.create_file("xfs-quota-kit.toml", "[monitor]\nalert_threshold = 150\n")?;

        let err = XqkConfig::load(None).expect_err("threshold should be rejected");
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "monitor.alert_threshold"));
        Ok(())
    });
}

#[test]
fn malformed_toml_is_a_figment_error() {
    Jail::expect_with(|jail| {
        let dir = jail.directory().display().to_string();
        jail.set_env("XDG_CONFIG_HOME", dir);
        jail.create_file("xfs-quota-kit.toml", "[xfs\ndefault_path = ")?;

        let err = XqkConfig::load(None).expect_err("parse should fail");
        assert!(matches!(err, ConfigError::Figment(_)));
        Ok(())
    });
}
