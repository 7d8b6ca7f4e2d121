use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use xqk_config::{LogFormat, LoggingConfig, XqkConfig};

mod cli;
mod commands;
mod context;
mod output;
mod ui;

/// Environment variable holding a tracing filter directive; wins over flags
/// and config.
const LOG_ENV: &str = "XFS_QUOTA_LOG";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("xfs-quota-kit error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    let flags = cli.global_flags();

    if let cli::Commands::Completion { shell } = cli.command {
        return commands::completion::handle(shell);
    }

    let config = XqkConfig::load(flags.config.as_deref()).context("failed to load configuration")?;
    init_tracing(&flags, &config.logging)?;
    ui::init(&flags);

    let ctx = context::AppContext::init(config);
    commands::dispatch::dispatch(cli.command, &ctx, &flags).await
}

fn init_tracing(flags: &cli::GlobalFlags, logging: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(log_level(flags, logging)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let installed = match logging.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
    installed.map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))
}

fn log_level<'a>(flags: &cli::GlobalFlags, logging: &'a LoggingConfig) -> &'a str {
    if flags.quiet {
        "error"
    } else if flags.verbose {
        "debug"
    } else {
        &logging.level
    }
}
