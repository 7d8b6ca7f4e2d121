use std::path::PathBuf;

use clap::Parser;

pub mod global;
pub mod root_commands;
pub mod subcommands;

pub use global::{GlobalFlags, OutputFormat};
pub use root_commands::Commands;

/// Top-level CLI parser for the `xfs-quota-kit` binary.
#[derive(Debug, Parser)]
#[command(
    name = "xfs-quota-kit",
    version,
    about = "Manage user, group and project quotas on XFS filesystems"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file layered over the standard locations
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format: json, table, raw
    #[arg(short, long, global = true, default_value = "table")]
    pub format: OutputFormat,

    /// Quiet mode (errors only on stderr)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Cli {
    /// Extract ergonomic global flags struct for command handlers.
    #[must_use]
    pub fn global_flags(&self) -> GlobalFlags {
        GlobalFlags {
            format: self.format,
            quiet: self.quiet,
            verbose: self.verbose,
            config: self.config.clone(),
        }
    }
}
