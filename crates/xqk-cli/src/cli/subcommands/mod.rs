pub mod monitor;
pub mod project;
pub mod quota;
pub mod report;

use std::path::PathBuf;

use clap::Args;

pub use monitor::{MonitorCommands, MonitorStartArgs};
pub use project::ProjectCommands;
pub use quota::{QuotaBatchArgs, QuotaCommands, QuotaListArgs, QuotaSetArgs, QuotaTarget};
pub use report::{ReportCommands, ReportGenerateArgs};

/// A filesystem path argument that falls back to `xfs.default_path`.
#[derive(Clone, Debug, Args)]
pub struct PathArg {
    /// Path on the XFS filesystem (defaults to `xfs.default_path`).
    pub path: Option<PathBuf>,
}
