use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Which quota kinds the filesystem was mounted with accounting for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaAccounting {
    pub user: bool,
    pub group: bool,
    pub project: bool,
}

impl QuotaAccounting {
    /// Derive accounting state from XFS mount options.
    ///
    /// Enforcing and accounting-only (`*noenforce`) options both count.
    #[must_use]
    pub fn from_mount_options<S: AsRef<str>>(options: &[S]) -> Self {
        let mut accounting = Self::default();
        for option in options {
            match option.as_ref() {
                "uquota" | "usrquota" | "quota" | "uqnoenforce" | "qnoenforce" => {
                    accounting.user = true;
                }
                "gquota" | "grpquota" | "gqnoenforce" => accounting.group = true,
                "pquota" | "prjquota" | "pqnoenforce" => accounting.project = true,
                _ => {}
            }
        }
        accounting
    }
}

/// Space, inode, and quota-accounting facts for the filesystem holding a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesystemInfo {
    pub path: PathBuf,
    pub device: String,
    pub mount_point: PathBuf,
    pub fs_type: String,
    /// `statfs` magic rendered as `0x...`.
    pub fs_magic: String,
    pub is_xfs: bool,
    pub block_size: u64,
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
    pub total_inodes: u64,
    pub free_inodes: u64,
    pub quota_accounting: QuotaAccounting,
}
