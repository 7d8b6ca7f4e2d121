use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Usage monitoring.
#[derive(Clone, Debug, Subcommand)]
pub enum MonitorCommands {
    /// Sample usage periodically and alert on entities near their limits.
    Start(MonitorStartArgs),
}

#[derive(Clone, Debug, Args)]
pub struct MonitorStartArgs {
    /// Path on the XFS filesystem (defaults to `xfs.default_path`).
    pub path: Option<PathBuf>,

    /// Time between samples (e.g. 30s, 5m); defaults to `monitor.interval`.
    #[arg(long)]
    pub interval: Option<humantime::Duration>,

    /// Alert percentage; defaults to `monitor.alert_threshold`.
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub threshold: Option<u8>,

    /// Take one sample and exit.
    #[arg(long)]
    pub once: bool,
}
