//! CLI response types returned as JSON by `xfs-quota-kit` commands.
//!
//! Read-only commands print entities directly (`QuotaRecord`, `QuotaReport`,
//! `ProjectEntry`, `FilesystemInfo`); mutations print one of these.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::QuotaLimits;
use crate::enums::EntityKind;
use crate::errors::ErrorKind;

/// Response from `quota set` and `quota remove`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuotaChangeResponse {
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub id: u32,
    pub path: PathBuf,
    pub limits: QuotaLimits,
}

/// One failed entry of a batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchFailure {
    pub id: u32,
    pub kind: ErrorKind,
    pub error: String,
}

/// Response from `quota batch`. Partial application is reported, not rolled back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchResponse {
    pub applied: Vec<u32>,
    pub failed: Vec<BatchFailure>,
}

/// Response from `project remove`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectRemoveResponse {
    pub name: String,
    pub removed: bool,
}

/// Response from `report status`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusResponse {
    pub path: PathBuf,
    pub is_xfs: bool,
}

/// An entity at or above the monitoring threshold.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorAlert {
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub id: u32,
    pub block_percent: f64,
    pub inode_percent: f64,
    pub over_quota: bool,
}

/// One tick of `monitor start`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorSample {
    pub filesystem: PathBuf,
    pub checked_at: DateTime<Utc>,
    pub threshold: u8,
    pub total_quotas: usize,
    pub over_quotas: usize,
    pub warning_quotas: usize,
    pub alerts: Vec<MonitorAlert>,
}
