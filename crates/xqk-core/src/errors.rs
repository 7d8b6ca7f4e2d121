//! Cross-cutting error types for xfs-quota-kit.
//!
//! `ErrorKind` is the flat taxonomy every crate maps its failures onto, so
//! callers can branch on *what* went wrong without matching on each crate's
//! error enum. Component errors (`ResolveError`, `ControlError`,
//! `RegistryError`, `QuotaError`) live in `xqk-quota` and expose `kind()`.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Category of a failure, independent of the component that raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidFormat,
    NegativeSize,
    NotMounted,
    IoFailure,
    PermissionDenied,
    NoSuchEntity,
    DeviceError,
    InvalidLimits,
    AlreadyExists,
    NotFound,
    CorruptRegistry,
    NotXfs,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidFormat => "invalid_format",
            Self::NegativeSize => "negative_size",
            Self::NotMounted => "not_mounted",
            Self::IoFailure => "io_failure",
            Self::PermissionDenied => "permission_denied",
            Self::NoSuchEntity => "no_such_entity",
            Self::DeviceError => "device_error",
            Self::InvalidLimits => "invalid_limits",
            Self::AlreadyExists => "already_exists",
            Self::NotFound => "not_found",
            Self::CorruptRegistry => "corrupt_registry",
            Self::NotXfs => "not_xfs",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A string that does not name an entity kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid quota type '{0}' (expected user, group, project or u, g, p)")]
pub struct ParseKindError(pub String);

/// Failures of the size codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SizeError {
    /// The numeric portion does not parse, is not finite, or overflows.
    #[error("invalid size format: '{0}'")]
    InvalidFormat(String),

    /// The numeric portion is below zero.
    #[error("size cannot be negative: '{0}'")]
    NegativeSize(String),
}

impl SizeError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidFormat(_) => ErrorKind::InvalidFormat,
            Self::NegativeSize(_) => ErrorKind::NegativeSize,
        }
    }
}

/// A soft limit above its hard limit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LimitsError {
    #[error("block soft limit {soft} KB exceeds hard limit {hard} KB")]
    BlockSoftAboveHard { soft: u64, hard: u64 },

    #[error("inode soft limit {soft} exceeds hard limit {hard}")]
    InodeSoftAboveHard { soft: u64, hard: u64 },
}

impl LimitsError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidLimits
    }
}
