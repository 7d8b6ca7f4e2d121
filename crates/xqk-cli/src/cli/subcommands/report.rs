use std::path::PathBuf;

use clap::{Args, Subcommand};

use super::PathArg;

/// Reports and filesystem details.
#[derive(Clone, Debug, Subcommand)]
pub enum ReportCommands {
    /// Usage report across user, group and project quotas.
    Generate(ReportGenerateArgs),
    /// Device, mount, capacity and quota accounting details.
    Filesystem(PathArg),
    /// Fail unless the path is on an XFS filesystem.
    Status(PathArg),
}

#[derive(Clone, Debug, Args)]
pub struct ReportGenerateArgs {
    /// Path on the XFS filesystem (defaults to `xfs.default_path`).
    pub path: Option<PathBuf>,

    /// Also write the report as JSON to this file.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
