use serde::{Deserialize, Serialize};

use crate::errors::LimitsError;

/// Soft and hard limits for one entity. Block values are KB.
///
/// `0` in any field means "no limit configured".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaLimits {
    pub block_soft: u64,
    pub block_hard: u64,
    pub inode_soft: u64,
    pub inode_hard: u64,
}

impl QuotaLimits {
    /// Limits that remove all enforcement.
    pub const UNLIMITED: Self = Self {
        block_soft: 0,
        block_hard: 0,
        inode_soft: 0,
        inode_hard: 0,
    };

    /// Reject a soft limit above a configured hard limit.
    ///
    /// A hard limit of 0 is "unlimited", so any soft limit is accepted with it.
    ///
    /// # Errors
    ///
    /// Returns [`LimitsError`] naming the offending dimension.
    pub const fn validate(&self) -> Result<(), LimitsError> {
        if self.block_hard > 0 && self.block_soft > self.block_hard {
            return Err(LimitsError::BlockSoftAboveHard {
                soft: self.block_soft,
                hard: self.block_hard,
            });
        }
        if self.inode_hard > 0 && self.inode_soft > self.inode_hard {
            return Err(LimitsError::InodeSoftAboveHard {
                soft: self.inode_soft,
                hard: self.inode_hard,
            });
        }
        Ok(())
    }

    #[must_use]
    pub const fn is_unlimited(&self) -> bool {
        self.block_soft == 0 && self.block_hard == 0 && self.inode_soft == 0 && self.inode_hard == 0
    }
}
