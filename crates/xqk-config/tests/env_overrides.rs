use figment::Jail;
use xqk_config::XqkConfig;

#[test]
fn env_overrides_nested_values() {
    Jail::expect_with(|jail| {
        let dir = jail.directory().display().to_string();
        jail.set_env("XDG_CONFIG_HOME", dir);
        jail.set_env("XFS_QUOTA_XFS__DEFAULT_PATH", "/data/xfs");
        jail.set_env("XFS_QUOTA_MONITOR__ALERT_THRESHOLD", "90");
        jail.set_env("XFS_QUOTA_XFS__DEFAULT_LIMITS__USER_INODE_HARD", "500000");

        let config = XqkConfig::load(None).expect("config loads");
        assert_eq!(config.xfs.default_path, "/data/xfs");
        assert_eq!(config.monitor.alert_threshold, 90);
        assert_eq!(config.xfs.default_limits.user_inode_hard, 500_000);
        Ok(())
    });
}

#[test]
fn env_beats_toml() {
    Jail::expect_with(|jail| {
        let dir = jail.directory().display().to_string();
        jail.set_env("XDG_CONFIG_HOME", dir);
        jail.create_file("xfs-quota-kit.toml", "[logging]\nlevel = \"warn\"\n")?;
        jail.set_env("XFS_QUOTA_LOGGING__LEVEL", "error");

        let config = XqkConfig::load(None).expect("config loads");
        assert_eq!(config.logging.level, "error");
        Ok(())
    });
}
