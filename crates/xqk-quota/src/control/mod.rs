//! The kernel quota channel.
//!
//! `QuotaControl` is the seam between the engine and the kernel. The XFS
//! implementation issues `quotactl(2)` and `ioctl(2)` calls directly; the
//! in-memory implementation backs tests and dry runs.

pub mod memory;
pub mod xfs;

use std::path::Path;

use xqk_core::entities::QuotaLimits;
use xqk_core::enums::EntityKind;

use crate::error::ControlError;

pub use memory::MemoryQuotaControl;
pub use xfs::XfsQuotaControl;

/// Limits and usage for one id as reported by the kernel, in KB and inodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskQuota {
    pub id: u32,
    pub limits: QuotaLimits,
    pub block_used: u64,
    pub inode_used: u64,
}

pub trait QuotaControl: Send + Sync {
    /// Read the dquot for `id`.
    ///
    /// # Errors
    ///
    /// `ControlError::NoSuchEntity` when the kernel has no record for `id`.
    fn get(&self, kind: EntityKind, id: u32, device: &str) -> Result<DiskQuota, ControlError>;

    /// Replace all four limits for `id`.
    ///
    /// # Errors
    ///
    /// `ControlError::InvalidLimits` when a soft limit exceeds its non-zero
    /// hard limit; kernel failures otherwise.
    fn set(
        &self,
        kind: EntityKind,
        id: u32,
        device: &str,
        limits: &QuotaLimits,
    ) -> Result<(), ControlError>;

    /// Clear all limits for `id`. Usage is untouched.
    ///
    /// # Errors
    ///
    /// Kernel failures as for [`QuotaControl::set`].
    fn remove(&self, kind: EntityKind, id: u32, device: &str) -> Result<(), ControlError> {
        self.set(kind, id, device, &QuotaLimits::UNLIMITED)
    }

    /// Every id of `kind` the kernel holds a record for, ascending.
    ///
    /// # Errors
    ///
    /// Kernel failures other than end-of-enumeration.
    fn ids(&self, kind: EntityKind, device: &str) -> Result<Vec<u32>, ControlError>;

    /// Tag `dir` with project `id` and mark it so new children inherit it.
    ///
    /// # Errors
    ///
    /// Failures opening the directory or updating its attributes.
    fn assign_project(&self, dir: &Path, id: u32) -> Result<(), ControlError>;
}

impl<T: QuotaControl + ?Sized> QuotaControl for std::sync::Arc<T> {
    fn get(&self, kind: EntityKind, id: u32, device: &str) -> Result<DiskQuota, ControlError> {
        (**self).get(kind, id, device)
    }

    fn set(
        &self,
        kind: EntityKind,
        id: u32,
        device: &str,
        limits: &QuotaLimits,
    ) -> Result<(), ControlError> {
        (**self).set(kind, id, device, limits)
    }

    fn remove(&self, kind: EntityKind, id: u32, device: &str) -> Result<(), ControlError> {
        (**self).remove(kind, id, device)
    }

    fn ids(&self, kind: EntityKind, device: &str) -> Result<Vec<u32>, ControlError> {
        (**self).ids(kind, device)
    }

    fn assign_project(&self, dir: &Path, id: u32) -> Result<(), ControlError> {
        (**self).assign_project(dir, id)
    }
}

/// 512-byte basic blocks to KB.
#[must_use]
pub const fn bb_to_kb(basic_blocks: u64) -> u64 {
    basic_blocks / 2
}

/// KB to 512-byte basic blocks.
#[must_use]
pub const fn kb_to_bb(kb: u64) -> u64 {
    kb.saturating_mul(2)
}
