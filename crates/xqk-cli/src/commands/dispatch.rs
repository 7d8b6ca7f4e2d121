use xqk_quota::QuotaControl;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::Commands;
use crate::commands;
use crate::context::AppContext;

/// Dispatch a parsed command to the corresponding handler module.
pub async fn dispatch<C: QuotaControl + 'static>(
    command: Commands,
    ctx: &AppContext<C>,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match command {
        Commands::Quota { action } => commands::quota::handle(&action, ctx, flags).await,
        Commands::Project { action } => commands::project::handle(&action, ctx, flags).await,
        Commands::Report { action } => commands::report::handle(&action, ctx, flags).await,
        Commands::Monitor { action } => commands::monitor::handle(&action, ctx, flags).await,
        Commands::Completion { .. } => unreachable!("completion is pre-dispatched in main"),
    }
}
