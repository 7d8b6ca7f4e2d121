use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use chrono::Utc;
use tokio::signal;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use xqk_core::entities::QuotaReport;
use xqk_core::responses::{MonitorAlert, MonitorSample};
use xqk_quota::QuotaControl;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::{MonitorCommands, MonitorStartArgs};
use crate::context::AppContext;
use crate::output::output_sample;

/// Handle `xfs-quota-kit monitor`.
pub async fn handle<C: QuotaControl + 'static>(
    action: &MonitorCommands,
    ctx: &AppContext<C>,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match action {
        MonitorCommands::Start(args) => start(args, ctx, flags).await,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MonitorPlan {
    pub path: PathBuf,
    pub interval: Duration,
    pub threshold: u8,
}

/// Merge `monitor start` flags over the `[monitor]` config section.
pub(crate) fn plan<C: QuotaControl + 'static>(
    args: &MonitorStartArgs,
    ctx: &AppContext<C>,
) -> anyhow::Result<MonitorPlan> {
    let config = &ctx.config.monitor;
    if !config.enabled {
        bail!("monitoring is disabled (set monitor.enabled = true to start it)");
    }
    let interval = args.interval.map_or(config.interval, Into::into);
    if interval.is_zero() {
        bail!("monitor interval must be greater than zero");
    }
    Ok(MonitorPlan {
        path: ctx.target_path(args.path.as_deref()),
        interval,
        threshold: args.threshold.unwrap_or(config.alert_threshold),
    })
}

async fn start<C: QuotaControl + 'static>(
    args: &MonitorStartArgs,
    ctx: &AppContext<C>,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let plan = plan(args, ctx)?;
    info!(
        path = %plan.path.display(),
        interval = %humantime::format_duration(plan.interval),
        threshold = plan.threshold,
        "monitor started"
    );

    if args.once {
        let sample = take_sample(ctx, &plan.path, plan.threshold).await?;
        return output_sample(&sample, flags.format);
    }

    let mut ticker = tokio::time::interval(plan.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())
        .context("failed to install SIGTERM handler")?;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match take_sample(ctx, &plan.path, plan.threshold).await {
                    Ok(sample) => output_sample(&sample, flags.format)?,
                    Err(error) => warn!(error = %format!("{error:#}"), "monitor sample failed"),
                }
            }
            result = signal::ctrl_c() => {
                result.context("failed to listen for Ctrl-C")?;
                break;
            }
            _ = terminate.recv() => break,
        }
    }

    info!("monitor stopped");
    Ok(())
}

async fn take_sample<C: QuotaControl + 'static>(
    ctx: &AppContext<C>,
    path: &Path,
    threshold: u8,
) -> anyhow::Result<MonitorSample> {
    let path = path.to_path_buf();
    let report = ctx
        .blocking(move |engine| Ok(engine.generate_report(&path)?))
        .await?;
    let sample = sample(&report, threshold);
    for alert in &sample.alerts {
        warn!(
            kind = %alert.kind,
            id = alert.id,
            block_percent = alert.block_percent,
            inode_percent = alert.inode_percent,
            over_quota = alert.over_quota,
            "quota usage alert"
        );
    }
    Ok(sample)
}

/// Summarize a report. Records over quota, or whose block or inode usage
/// is at or above `threshold` percent, become alerts.
pub(crate) fn sample(report: &QuotaReport, threshold: u8) -> MonitorSample {
    let limit = f64::from(threshold);
    let alerts = report
        .quotas
        .iter()
        .filter_map(|record| {
            let block_percent = record.block_usage_percent();
            let inode_percent = record.inode_usage_percent();
            let over_quota = record.is_block_exceeded() || record.is_inode_exceeded();
            (over_quota || block_percent >= limit || inode_percent >= limit).then_some(
                MonitorAlert {
                    kind: record.kind,
                    id: record.id,
                    block_percent,
                    inode_percent,
                    over_quota,
                },
            )
        })
        .collect();

    MonitorSample {
        filesystem: report.filesystem.clone(),
        checked_at: Utc::now(),
        threshold,
        total_quotas: report.total_quotas,
        over_quotas: report.over_quotas,
        warning_quotas: report.warning_quotas,
        alerts,
    }
}
