use std::path::PathBuf;

use clap::Subcommand;

/// Project registry management.
#[derive(Clone, Debug, Subcommand)]
pub enum ProjectCommands {
    /// Register a project, allocate its id and tag its directory.
    Create {
        /// Project name (no ':' or whitespace).
        name: String,
        /// Directory the project covers.
        path: PathBuf,
    },
    /// Unregister a project. Its id is never handed out again.
    Remove {
        /// Project name.
        name: String,
    },
    /// List registered projects.
    List,
}
