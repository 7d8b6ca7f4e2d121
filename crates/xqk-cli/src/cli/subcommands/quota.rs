use std::path::PathBuf;

use clap::{Args, Subcommand};
use xqk_core::enums::EntityKind;

/// Quota limit management.
#[derive(Clone, Debug, Subcommand)]
pub enum QuotaCommands {
    /// Show usage and limits for one entity.
    Get(QuotaTarget),
    /// Set limits for one entity.
    Set(QuotaSetArgs),
    /// Clear all limits for one entity.
    Remove(QuotaTarget),
    /// List every entity of a type with a quota record.
    List(QuotaListArgs),
    /// Apply limits for many entities from a TOML or JSON file.
    Batch(QuotaBatchArgs),
}

/// Identifies one entity on one filesystem.
#[derive(Clone, Debug, Args)]
pub struct QuotaTarget {
    /// Path on the XFS filesystem (defaults to `xfs.default_path`).
    pub path: Option<PathBuf>,

    /// Quota type: user, group, project (or u, g, p).
    #[arg(short = 't', long = "type", default_value = "user")]
    pub kind: EntityKind,

    /// Numeric user, group or project id.
    #[arg(short, long, required_unless_present = "name", conflicts_with = "name")]
    pub id: Option<u32>,

    /// Project name, resolved to its id through the registry.
    #[arg(short, long)]
    pub name: Option<String>,
}

#[derive(Clone, Debug, Args)]
pub struct QuotaSetArgs {
    #[command(flatten)]
    pub target: QuotaTarget,

    /// Block soft limit (e.g. 500MB, 1.5GB).
    #[arg(long)]
    pub block_soft: Option<String>,

    /// Block hard limit (e.g. 1GB, 2TB).
    #[arg(long)]
    pub block_hard: Option<String>,

    /// Inode soft limit.
    #[arg(long)]
    pub inode_soft: Option<u64>,

    /// Inode hard limit.
    #[arg(long)]
    pub inode_hard: Option<u64>,

    /// Start from the configured default limits for this type.
    #[arg(long)]
    pub defaults: bool,
}

#[derive(Clone, Debug, Args)]
pub struct QuotaListArgs {
    /// Path on the XFS filesystem (defaults to `xfs.default_path`).
    pub path: Option<PathBuf>,

    /// Quota type: user, group, project (or u, g, p).
    #[arg(short = 't', long = "type", default_value = "user")]
    pub kind: EntityKind,
}

#[derive(Clone, Debug, Args)]
pub struct QuotaBatchArgs {
    /// Path on the XFS filesystem (defaults to `xfs.default_path`).
    pub path: Option<PathBuf>,

    /// Quota type: user, group, project (or u, g, p).
    #[arg(short = 't', long = "type", default_value = "user")]
    pub kind: EntityKind,

    /// Entries file; `.json` is read as JSON, anything else as TOML.
    #[arg(long)]
    pub file: PathBuf,
}
