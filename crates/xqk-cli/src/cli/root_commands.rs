use clap::Subcommand;
use clap_complete::Shell;

use crate::cli::subcommands::{MonitorCommands, ProjectCommands, QuotaCommands, ReportCommands};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// User, group and project quota limits.
    Quota {
        #[command(subcommand)]
        action: QuotaCommands,
    },
    /// Project registry (`/etc/projects`, `/etc/projid`).
    Project {
        #[command(subcommand)]
        action: ProjectCommands,
    },
    /// Usage reports and filesystem details.
    Report {
        #[command(subcommand)]
        action: ReportCommands,
    },
    /// Periodic usage sampling with threshold alerts.
    Monitor {
        #[command(subcommand)]
        action: MonitorCommands,
    },
    /// Print a shell completion script to stdout.
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}
