//! Entity kinds and quota status classification.
//!
//! All enums serialize as lowercase strings. `EntityKind` also accepts the
//! single-letter aliases used on the command line (`u`, `g`, `p`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ParseKindError;

// ---------------------------------------------------------------------------
// EntityKind
// ---------------------------------------------------------------------------

/// The owner class a quota applies to.
///
/// Each kind maps onto one kernel quota type and one XFS on-disk dquot flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    User,
    Group,
    Project,
}

impl EntityKind {
    /// Every kind, in report order.
    pub const ALL: [Self; 3] = [Self::User, Self::Group, Self::Project];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Group => "group",
            Self::Project => "project",
        }
    }

    /// Kernel quota type (`USRQUOTA`, `GRPQUOTA`, `PRJQUOTA`).
    #[must_use]
    pub const fn kernel_type(self) -> u32 {
        match self {
            Self::User => 0,
            Self::Group => 1,
            Self::Project => 2,
        }
    }

    /// XFS `fs_disk_quota.d_flags` value (`FS_USER_QUOTA`, `FS_GROUP_QUOTA`, `FS_PROJ_QUOTA`).
    #[must_use]
    pub const fn xfs_flag(self) -> i8 {
        match self {
            Self::User => 1,
            Self::Group => 4,
            Self::Project => 2,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" | "u" => Ok(Self::User),
            "group" | "g" => Ok(Self::Group),
            "project" | "p" => Ok(Self::Project),
            _ => Err(ParseKindError(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// QuotaStatus
// ---------------------------------------------------------------------------

/// Classification of a single quota record.
///
/// ```text
/// over     : used >= hard (hard > 0) in either dimension
/// warning  : usage% > 80 in either dimension
/// ok       : everything else, including entities without hard limits
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaStatus {
    Ok,
    Warning,
    Over,
}

impl QuotaStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warning => "warning",
            Self::Over => "over",
        }
    }
}

impl fmt::Display for QuotaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_and_aliases() {
        assert_eq!("user".parse::<EntityKind>().unwrap(), EntityKind::User);
        assert_eq!("G".parse::<EntityKind>().unwrap(), EntityKind::Group);
        assert_eq!(" p ".parse::<EntityKind>().unwrap(), EntityKind::Project);
        assert_eq!("Project".parse::<EntityKind>().unwrap(), EntityKind::Project);
    }

    #[test]
    fn rejects_unknown_kind() {
        let err = "volume".parse::<EntityKind>().unwrap_err();
        assert!(err.to_string().contains("volume"));
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&EntityKind::Project).unwrap();
        assert_eq!(json, "\"project\"");
        let status = serde_json::to_string(&QuotaStatus::Warning).unwrap();
        assert_eq!(status, "\"warning\"");
    }

    #[test]
    fn kernel_mapping_matches_quota_h() {
        assert_eq!(EntityKind::User.kernel_type(), 0);
        assert_eq!(EntityKind::Group.kernel_type(), 1);
        assert_eq!(EntityKind::Project.kernel_type(), 2);
        assert_eq!(EntityKind::Group.xfs_flag(), 4);
    }
}
