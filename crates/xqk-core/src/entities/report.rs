use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::QuotaRecord;
use crate::enums::QuotaStatus;

/// Usage summary for one filesystem across all entity kinds.
///
/// Built only through [`QuotaReport::from_records`] so the counters always
/// match a scan of `quotas`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaReport {
    pub filesystem: PathBuf,
    pub generated_at: DateTime<Utc>,
    pub total_quotas: usize,
    pub over_quotas: usize,
    pub warning_quotas: usize,
    pub quotas: Vec<QuotaRecord>,
}

impl QuotaReport {
    /// Classify each record once and count the results.
    #[must_use]
    pub fn from_records(filesystem: PathBuf, quotas: Vec<QuotaRecord>) -> Self {
        let (mut over, mut warning) = (0, 0);
        for record in &quotas {
            match record.status() {
                QuotaStatus::Over => over += 1,
                QuotaStatus::Warning => warning += 1,
                QuotaStatus::Ok => {}
            }
        }

        Self {
            filesystem,
            generated_at: Utc::now(),
            total_quotas: quotas.len(),
            over_quotas: over,
            warning_quotas: warning,
            quotas,
        }
    }

    #[must_use]
    pub const fn ok_quotas(&self) -> usize {
        self.total_quotas - self.over_quotas - self.warning_quotas
    }
}
