use std::path::Path;

use anyhow::{Context, bail};
use tracing::info;
use xqk_core::entities::{FilesystemInfo, QuotaReport};
use xqk_core::responses::StatusResponse;
use xqk_quota::QuotaControl;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::{PathArg, ReportCommands, ReportGenerateArgs};
use crate::context::AppContext;
use crate::output::{output, output_filesystem, output_report};

/// Handle `xfs-quota-kit report`.
pub async fn handle<C: QuotaControl + 'static>(
    action: &ReportCommands,
    ctx: &AppContext<C>,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match action {
        ReportCommands::Generate(args) => output_report(&generate(args, ctx).await?, flags.format),
        ReportCommands::Filesystem(args) => {
            output_filesystem(&filesystem(args, ctx).await?, flags.format)
        }
        ReportCommands::Status(args) => {
            let status = status(args, ctx).await?;
            output(&status, flags.format)?;
            if !status.is_xfs {
                bail!("'{}' is not on an XFS filesystem", status.path.display());
            }
            Ok(())
        }
    }
}

pub(crate) async fn generate<C: QuotaControl + 'static>(
    args: &ReportGenerateArgs,
    ctx: &AppContext<C>,
) -> anyhow::Result<QuotaReport> {
    let path = ctx.target_path(args.path.as_deref());
    let report = ctx
        .blocking(move |engine| Ok(engine.generate_report(&path)?))
        .await?;
    if let Some(file) = &args.output {
        write_report(&report, file)?;
    }
    Ok(report)
}

/// Save the report as pretty JSON.
fn write_report(report: &QuotaReport, file: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(file, json + "\n")
        .with_context(|| format!("failed to write report to '{}'", file.display()))?;
    info!(file = %file.display(), quotas = report.total_quotas, "report written");
    Ok(())
}

pub(crate) async fn filesystem<C: QuotaControl + 'static>(
    args: &PathArg,
    ctx: &AppContext<C>,
) -> anyhow::Result<FilesystemInfo> {
    let path = ctx.target_path(args.path.as_deref());
    ctx.blocking(move |engine| Ok(engine.filesystem_info(&path)?))
        .await
}

pub(crate) async fn status<C: QuotaControl + 'static>(
    args: &PathArg,
    ctx: &AppContext<C>,
) -> anyhow::Result<StatusResponse> {
    let path = ctx.target_path(args.path.as_deref());
    let probe = path.clone();
    let is_xfs = ctx
        .blocking(move |engine| Ok(engine.is_xfs(&probe)?))
        .await?;
    Ok(StatusResponse { path, is_xfs })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use xqk_core::enums::EntityKind;
    use xqk_quota::QuotaControl as _;

    use super::*;
    use crate::commands::testing::{DEVICE, Sandbox};

    fn limits(block_hard: u64) -> xqk_core::entities::QuotaLimits {
        xqk_core::entities::QuotaLimits {
            block_soft: block_hard / 2,
            block_hard,
            inode_soft: 0,
            inode_hard: 0,
        }
    }

    #[tokio::test]
    async fn generate_counts_and_writes_json() {
        let sandbox = Sandbox::new();
        let control = sandbox.control();
        control.set(EntityKind::User, 1, DEVICE, &limits(100)).unwrap();
        control.set_usage(EntityKind::User, 1, DEVICE, 100, 0);
        control.set(EntityKind::Group, 2, DEVICE, &limits(100)).unwrap();
        control.set_usage(EntityKind::Group, 2, DEVICE, 90, 0);
        control.set(EntityKind::Project, 3, DEVICE, &limits(100)).unwrap();
        control.disable_accounting(EntityKind::Group, DEVICE);

        let out = sandbox.path("report.json");
        let args = ReportGenerateArgs {
            path: None,
            output: Some(out.clone()),
        };
        let report = generate(&args, &sandbox.ctx).await.unwrap();
        assert_eq!(report.total_quotas, 2);
        assert_eq!(report.over_quotas, 1);
        assert_eq!(report.warning_quotas, 0);

        let saved: QuotaReport = serde_json::from_str(&sandbox.read("report.json")).unwrap();
        assert_eq!(saved.total_quotas, 2);
        assert_eq!(saved.filesystem, sandbox.root);
    }

    #[tokio::test]
    async fn filesystem_info_reads_mount_options() {
        let sandbox = Sandbox::new();
        let info = filesystem(&PathArg { path: None }, &sandbox.ctx).await.unwrap();
        assert_eq!(info.device, DEVICE);
        assert_eq!(info.mount_point, sandbox.root);
        assert_eq!(info.fs_type, "xfs");
        assert!(info.quota_accounting.user);
        assert!(info.quota_accounting.project);
        assert!(info.total_bytes >= info.free_bytes);
    }

    #[tokio::test]
    async fn status_reports_filesystem_kind() {
        let sandbox = Sandbox::new();
        let status = status(&PathArg { path: None }, &sandbox.ctx).await.unwrap();
        assert_eq!(status.path, sandbox.root);
        assert_eq!(status.is_xfs, xqk_quota::fsstat::is_xfs(&sandbox.root).unwrap());
    }

    #[tokio::test]
    async fn status_of_missing_path_fails() {
        let sandbox = Sandbox::new();
        let args = PathArg {
            path: Some(sandbox.path("missing/dir")),
        };
        assert!(status(&args, &sandbox.ctx).await.is_err());
    }
}
