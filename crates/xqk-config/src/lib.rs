//! # xqk-config
//!
//! Layered configuration loading for xfs-quota-kit using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`XFS_QUOTA_*` prefix, `__` as separator)
//! 2. A file passed with `--config`
//! 3. Working-directory `./xfs-quota-kit.toml`
//! 4. User-level `~/.config/xfs-quota-kit/config.toml`
//! 5. System-level `/etc/xfs-quota-kit/config.toml`
//! 6. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `XFS_QUOTA_XFS__DEFAULT_PATH` -> `xfs.default_path`,
//! `XFS_QUOTA_MONITOR__ALERT_THRESHOLD` -> `monitor.alert_threshold`, etc.
//!
//! # Usage
//!
//! ```no_run
//! use xqk_config::XqkConfig;
//!
//! let config = XqkConfig::load(None).expect("config");
//! println!("registry: {}", config.xfs.projid_file);
//! ```

mod error;
mod logging;
mod monitor;
mod xfs;

pub use error::ConfigError;
pub use logging::{LogFormat, LoggingConfig};
pub use monitor::MonitorConfig;
pub use xfs::{DefaultLimits, XfsConfig};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment prefix for overrides.
pub const ENV_PREFIX: &str = "XFS_QUOTA_";

const SYSTEM_CONFIG_PATH: &str = "/etc/xfs-quota-kit/config.toml";
const LOCAL_CONFIG_PATH: &str = "xfs-quota-kit.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct XqkConfig {
    #[serde(default)]
    pub xfs: XfsConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl XqkConfig {
    /// Load and validate configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an explicit file is missing, a source fails to
    /// parse, or a value fails validation.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config: Self = Self::figment(explicit)?.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Build the figment provider chain.
    ///
    /// This is public so tests can inspect the figment directly or add
    /// additional providers on top.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingFile` if `explicit` does not exist.
    pub fn figment(explicit: Option<&Path>) -> Result<Figment, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        let system_path = PathBuf::from(SYSTEM_CONFIG_PATH);
        if system_path.exists() {
            figment = figment.merge(Toml::file(system_path));
        }

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        let local_path = PathBuf::from(LOCAL_CONFIG_PATH);
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConfigError::MissingFile(path.to_path_buf()));
            }
            figment = figment.merge(Toml::file(path));
        }

        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Check cross-field constraints figment cannot express.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !logging::VALID_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "logging.level".into(),
                reason: format!(
                    "'{}' is not one of {}",
                    self.logging.level,
                    logging::VALID_LEVELS.join(", ")
                ),
            });
        }

        if !(1..=100).contains(&self.monitor.alert_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "monitor.alert_threshold".into(),
                reason: format!("{} is outside 1..=100", self.monitor.alert_threshold),
            });
        }

        if self.monitor.interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "monitor.interval".into(),
                reason: "interval must be greater than zero".into(),
            });
        }

        if self.xfs.projects_file == self.xfs.projid_file {
            return Err(ConfigError::InvalidValue {
                field: "xfs.projid_file".into(),
                reason: "projects_file and projid_file must be different files".into(),
            });
        }

        self.xfs.default_limits.validate()
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("xfs-quota-kit").join("config.toml"))
    }
}
