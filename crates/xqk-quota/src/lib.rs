//! # xqk-quota
//!
//! The XFS quota engine for xfs-quota-kit.
//!
//! - [`mounts`] maps a path onto the block device whose mount covers it
//! - [`control`] is the kernel quota channel (`quotactl(2)`, project-id ioctls)
//!   behind the [`QuotaControl`] trait, with an in-memory implementation
//! - [`registry`] maintains the `projects`/`projid` files under a lock
//! - [`engine`] composes them into the operations the CLI exposes
//!
//! ```no_run
//! use std::path::Path;
//! use xqk_core::enums::EntityKind;
//! use xqk_quota::{EngineSettings, QuotaEngine, XfsQuotaControl};
//!
//! let engine = QuotaEngine::new(XfsQuotaControl::new(), &EngineSettings::default());
//! let record = engine.get_quota(EntityKind::User, 1001, Path::new("/mnt/xfs"))?;
//! println!("{} KB used", record.block_used);
//! # Ok::<(), xqk_quota::QuotaError>(())
//! ```

#[cfg(not(target_os = "linux"))]
compile_error!("xqk-quota drives the Linux quota subsystem and only builds on Linux");

pub mod control;
pub mod engine;
pub mod error;
pub mod fsstat;
pub mod mounts;
pub mod registry;

pub use control::{DiskQuota, MemoryQuotaControl, QuotaControl, XfsQuotaControl};
pub use engine::{EngineSettings, QuotaEngine};
pub use error::{
    BatchError, BatchOutcome, Cause, ControlError, FailedEntry, Operation, QuotaError,
    RegistryError, ResolveError,
};
pub use registry::ProjectRegistry;
