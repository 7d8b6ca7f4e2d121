//! Filesystem, registry, and default-limit configuration.

use serde::{Deserialize, Serialize};
use xqk_core::entities::QuotaLimits;
use xqk_core::size::parse_size_kb;

use crate::error::ConfigError;

fn default_path() -> String {
    "/mnt/xfs".to_string()
}

fn default_projects_file() -> String {
    "/etc/projects".to_string()
}

fn default_projid_file() -> String {
    "/etc/projid".to_string()
}

fn default_mounts_file() -> String {
    "/proc/self/mounts".to_string()
}

/// First id handed out when the registry is empty.
const fn default_first_project_id() -> u32 {
    1000
}

const fn default_auto_create() -> bool {
    true
}

const fn default_lock_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct XfsConfig {
    /// Filesystem path used when a command is given no path argument.
    #[serde(default = "default_path")]
    pub default_path: String,

    /// Project name -> directory registry (`name:path` lines).
    #[serde(default = "default_projects_file")]
    pub projects_file: String,

    /// Project name -> numeric id registry (`name:id` lines).
    #[serde(default = "default_projid_file")]
    pub projid_file: String,

    /// Live mount table consulted on every device lookup.
    #[serde(default = "default_mounts_file")]
    pub mounts_file: String,

    #[serde(default = "default_first_project_id")]
    pub first_project_id: u32,

    /// Create missing project directories on `project create`.
    #[serde(default = "default_auto_create")]
    pub auto_create: bool,

    /// How long a registry mutation waits for the registry lock.
    #[serde(default = "default_lock_timeout_secs")]
    pub lock_timeout_secs: u64,

    #[serde(default)]
    pub default_limits: DefaultLimits,
}

impl Default for XfsConfig {
    fn default() -> Self {
        Self {
            default_path: default_path(),
            projects_file: default_projects_file(),
            projid_file: default_projid_file(),
            mounts_file: default_mounts_file(),
            first_project_id: default_first_project_id(),
            auto_create: default_auto_create(),
            lock_timeout_secs: default_lock_timeout_secs(),
            default_limits: DefaultLimits::default(),
        }
    }
}

/// Default limits applied by `quota set --defaults`. Block limits are size strings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct DefaultLimits {
    pub user_block_soft: String,
    pub user_block_hard: String,
    pub user_inode_soft: u64,
    pub user_inode_hard: u64,
    pub group_block_soft: String,
    pub group_block_hard: String,
    pub group_inode_soft: u64,
    pub group_inode_hard: u64,
}

impl Default for DefaultLimits {
    fn default() -> Self {
        Self {
            user_block_soft: "1GB".to_string(),
            user_block_hard: "2GB".to_string(),
            user_inode_soft: 100_000,
            user_inode_hard: 200_000,
            group_block_soft: "10GB".to_string(),
            group_block_hard: "20GB".to_string(),
            group_inode_soft: 1_000_000,
            group_inode_hard: 2_000_000,
        }
    }
}

impl DefaultLimits {
    /// Parsed user defaults (block values in KB).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a size string does not parse.
    pub fn user_limits(&self) -> Result<QuotaLimits, ConfigError> {
        Ok(QuotaLimits {
            block_soft: parse_field("xfs.default_limits.user_block_soft", &self.user_block_soft)?,
            block_hard: parse_field("xfs.default_limits.user_block_hard", &self.user_block_hard)?,
            inode_soft: self.user_inode_soft,
            inode_hard: self.user_inode_hard,
        })
    }

    /// Parsed group defaults (block values in KB).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a size string does not parse.
    pub fn group_limits(&self) -> Result<QuotaLimits, ConfigError> {
        Ok(QuotaLimits {
            block_soft: parse_field(
                "xfs.default_limits.group_block_soft",
                &self.group_block_soft,
            )?,
            block_hard: parse_field(
                "xfs.default_limits.group_block_hard",
                &self.group_block_hard,
            )?,
            inode_soft: self.group_inode_soft,
            inode_hard: self.group_inode_hard,
        })
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        for (section, limits) in [("user", self.user_limits()?), ("group", self.group_limits()?)] {
            limits
                .validate()
                .map_err(|error| ConfigError::InvalidValue {
                    field: format!("xfs.default_limits.{section}"),
                    reason: error.to_string(),
                })?;
        }
        Ok(())
    }
}

fn parse_field(field: &str, value: &str) -> Result<u64, ConfigError> {
    parse_size_kb(value).map_err(|error| ConfigError::InvalidValue {
        field: field.to_string(),
        reason: error.to_string(),
    })
}
