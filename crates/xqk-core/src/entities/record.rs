use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::WARNING_THRESHOLD_PERCENT;
use crate::entities::QuotaLimits;
use crate::enums::{EntityKind, QuotaStatus};

/// Usage and limits for one entity on one filesystem, as observed at `last_updated`.
///
/// Block values are KB; inode values are raw counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaRecord {
    pub id: u32,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub path: PathBuf,
    pub device: String,
    pub block_used: u64,
    pub block_soft: u64,
    pub block_hard: u64,
    pub inode_used: u64,
    pub inode_soft: u64,
    pub inode_hard: u64,
    pub last_updated: DateTime<Utc>,
}

impl QuotaRecord {
    /// A zero-usage, zero-limit record for an entity the kernel has no dquot for.
    #[must_use]
    pub fn empty(kind: EntityKind, id: u32, path: PathBuf, device: String) -> Self {
        Self {
            id,
            kind,
            path,
            device,
            block_used: 0,
            block_soft: 0,
            block_hard: 0,
            inode_used: 0,
            inode_soft: 0,
            inode_hard: 0,
            last_updated: Utc::now(),
        }
    }

    #[must_use]
    pub const fn limits(&self) -> QuotaLimits {
        QuotaLimits {
            block_soft: self.block_soft,
            block_hard: self.block_hard,
            inode_soft: self.inode_soft,
            inode_hard: self.inode_hard,
        }
    }

    #[must_use]
    pub const fn is_block_exceeded(&self) -> bool {
        self.block_hard > 0 && self.block_used >= self.block_hard
    }

    #[must_use]
    pub const fn is_inode_exceeded(&self) -> bool {
        self.inode_hard > 0 && self.inode_used >= self.inode_hard
    }

    /// Block usage as a percentage of the hard limit; `0.0` without a hard limit.
    #[must_use]
    pub fn block_usage_percent(&self) -> f64 {
        percent(self.block_used, self.block_hard)
    }

    /// Inode usage as a percentage of the hard limit; `0.0` without a hard limit.
    #[must_use]
    pub fn inode_usage_percent(&self) -> f64 {
        percent(self.inode_used, self.inode_hard)
    }

    #[must_use]
    pub fn status(&self) -> QuotaStatus {
        if self.is_block_exceeded() || self.is_inode_exceeded() {
            QuotaStatus::Over
        } else if self.block_usage_percent() > WARNING_THRESHOLD_PERCENT
            || self.inode_usage_percent() > WARNING_THRESHOLD_PERCENT
        {
            QuotaStatus::Warning
        } else {
            QuotaStatus::Ok
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn percent(used: u64, hard: u64) -> f64 {
    if hard == 0 {
        return 0.0;
    }
    used as f64 / hard as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(block_used: u64, block_hard: u64, inode_used: u64, inode_hard: u64) -> QuotaRecord {
        QuotaRecord {
            block_used,
            block_hard,
            inode_used,
            inode_hard,
            ..QuotaRecord::empty(
                EntityKind::User,
                1001,
                PathBuf::from("/mnt/xfs"),
                "/dev/sdb1".into(),
            )
        }
    }

    #[test]
    fn zero_hard_limit_is_never_exceeded() {
        let r = record(u64::MAX, 0, u64::MAX, 0);
        assert!(!r.is_block_exceeded());
        assert!(!r.is_inode_exceeded());
        assert_eq!(r.block_usage_percent(), 0.0);
        assert_eq!(r.inode_usage_percent(), 0.0);
        assert_eq!(r.status(), QuotaStatus::Ok);
    }

    #[test]
    fn used_equal_to_hard_is_exceeded() {
        let r = record(100, 100, 0, 0);
        assert!(r.is_block_exceeded());
        assert_eq!(r.status(), QuotaStatus::Over);

        let r = record(0, 0, 7, 7);
        assert!(r.is_inode_exceeded());
        assert_eq!(r.status(), QuotaStatus::Over);
    }

    #[test]
    fn warning_is_strictly_above_eighty_percent() {
        assert_eq!(record(80, 100, 0, 0).status(), QuotaStatus::Ok);
        assert_eq!(record(81, 100, 0, 0).status(), QuotaStatus::Warning);
        assert_eq!(record(0, 0, 90, 100).status(), QuotaStatus::Warning);
    }

    #[test]
    fn percent_math() {
        let r = record(512, 1024, 25, 100);
        assert_eq!(r.block_usage_percent(), 50.0);
        assert_eq!(r.inode_usage_percent(), 25.0);
    }

    #[test]
    fn serializes_kind_as_type() {
        let value = serde_json::to_value(record(1, 2, 3, 4)).unwrap();
        assert_eq!(value["type"], "user");
        assert_eq!(value["block_hard"], 2);
        assert_eq!(value["device"], "/dev/sdb1");
    }
}
