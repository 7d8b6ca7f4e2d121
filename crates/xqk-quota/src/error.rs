//! Error types for the quota engine.
//!
//! Each component has its own enum; `QuotaError` wraps them with the engine
//! operation and the path it was invoked on. Every error exposes `kind()` so
//! callers can branch on the shared `ErrorKind` taxonomy.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;
use xqk_core::enums::EntityKind;
use xqk_core::errors::{ErrorKind, LimitsError};

/// Failures mapping a path onto its mounted block device.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no mounted filesystem covers '{}'", .0.display())]
    NotMounted(PathBuf),

    #[error("failed to {action} '{}'", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ResolveError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotMounted(_) => ErrorKind::NotMounted,
            Self::Io { .. } => ErrorKind::IoFailure,
        }
    }
}

/// Failures of the kernel quota channel.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("permission denied: {op} on {target}")]
    PermissionDenied { op: &'static str, target: String },

    #[error("no {kind} quota for id {id} on {device}")]
    NoSuchEntity {
        kind: EntityKind,
        id: u32,
        device: String,
    },

    #[error("{kind} quota accounting is not enabled on {device}")]
    NotEnabled { kind: EntityKind, device: String },

    #[error("{op} failed on {target}")]
    Device {
        op: &'static str,
        target: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    InvalidLimits(#[from] LimitsError),
}

impl ControlError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::NoSuchEntity { .. } => ErrorKind::NoSuchEntity,
            Self::NotEnabled { .. } | Self::Device { .. } => ErrorKind::DeviceError,
            Self::InvalidLimits(_) => ErrorKind::InvalidLimits,
        }
    }
}

/// Failures of the on-disk project registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("project '{0}' already exists")]
    AlreadyExists(String),

    #[error("project '{0}' not found")]
    NotFound(String),

    #[error("invalid project name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("registry file '{}' is corrupt: {reason}", file.display())]
    Corrupt { file: PathBuf, reason: String },

    #[error("registry I/O failed on '{}'", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("timed out waiting for registry lock '{}' ({holder})", path.display())]
    LockTimeout { path: PathBuf, holder: String },

    #[error("failed to associate '{}' with project id {id}", dir.display())]
    Assign {
        id: u32,
        dir: PathBuf,
        #[source]
        source: ControlError,
    },
}

impl RegistryError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidName { .. } => ErrorKind::InvalidFormat,
            Self::Corrupt { .. } => ErrorKind::CorruptRegistry,
            Self::Io { .. } | Self::LockTimeout { .. } => ErrorKind::IoFailure,
            Self::Assign { source, .. } => source.kind(),
        }
    }
}

/// Engine operation an error was raised from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Get,
    Set,
    Remove,
    List,
    Batch,
    Report,
    Status,
    FilesystemInfo,
    CreateProject,
    RemoveProject,
    ListProjects,
    LookupProject,
}

impl Operation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Set => "set",
            Self::Remove => "remove",
            Self::List => "list",
            Self::Batch => "batch",
            Self::Report => "report",
            Self::Status => "status",
            Self::FilesystemInfo => "info",
            Self::CreateProject => "project-create",
            Self::RemoveProject => "project-remove",
            Self::ListProjects => "project-list",
            Self::LookupProject => "project-lookup",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The component failure underneath a `QuotaError`.
#[derive(Debug, Error)]
pub enum Cause {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Control(#[from] ControlError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("'{}' is not on an XFS filesystem", .0.display())]
    NotXfs(PathBuf),
}

impl Cause {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Resolve(e) => e.kind(),
            Self::Control(e) => e.kind(),
            Self::Registry(e) => e.kind(),
            Self::NotXfs(_) => ErrorKind::NotXfs,
        }
    }
}

/// An engine failure: which operation, on which path, and why.
#[derive(Debug, Error)]
#[error("{op} failed for '{}'", path.display())]
pub struct QuotaError {
    pub op: Operation,
    pub path: PathBuf,
    #[source]
    pub cause: Cause,
}

impl QuotaError {
    pub fn new(op: Operation, path: impl Into<PathBuf>, cause: impl Into<Cause>) -> Self {
        Self {
            op,
            path: path.into(),
            cause: cause.into(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.cause.kind()
    }

    /// True when the kernel reports accounting disabled for the entity kind.
    #[must_use]
    pub const fn is_accounting_disabled(&self) -> bool {
        matches!(self.cause, Cause::Control(ControlError::NotEnabled { .. }))
    }

    #[must_use]
    pub const fn is_no_such_entity(&self) -> bool {
        matches!(self.cause, Cause::Control(ControlError::NoSuchEntity { .. }))
    }

    #[must_use]
    pub(crate) fn with_op(mut self, op: Operation) -> Self {
        self.op = op;
        self
    }
}

/// Outcome of a batch that applied every entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub applied: Vec<u32>,
}

/// One entry of a batch that failed.
#[derive(Debug)]
pub struct FailedEntry {
    pub id: u32,
    pub error: QuotaError,
}

/// A batch in which at least one entry failed. Entries not listed in
/// `failures` were applied.
#[derive(Debug, Error)]
#[error("batch on '{}': {} of {} entries failed", path.display(), failures.len(), failures.len() + applied.len())]
pub struct BatchError {
    pub path: PathBuf,
    pub applied: Vec<u32>,
    pub failures: Vec<FailedEntry>,
}
