use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, bail};
use serde::Deserialize;
use tracing::debug;
use xqk_config::XqkConfig;
use xqk_core::entities::{QuotaLimits, QuotaRecord};
use xqk_core::enums::EntityKind;
use xqk_core::errors::ErrorKind;
use xqk_core::responses::{BatchFailure, BatchResponse, QuotaChangeResponse};
use xqk_core::size::parse_size_kb;
use xqk_quota::QuotaControl;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::{QuotaBatchArgs, QuotaCommands, QuotaListArgs, QuotaSetArgs, QuotaTarget};
use crate::context::AppContext;
use crate::output::{output, output_record, output_records};

/// Handle `xfs-quota-kit quota`.
pub async fn handle<C: QuotaControl + 'static>(
    action: &QuotaCommands,
    ctx: &AppContext<C>,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match action {
        QuotaCommands::Get(target) => output_record(&get(target, ctx).await?, flags.format),
        QuotaCommands::Set(args) => output(&set(args, ctx).await?, flags.format),
        QuotaCommands::Remove(target) => output(&remove(target, ctx).await?, flags.format),
        QuotaCommands::List(args) => output_records(&list(args, ctx).await?, flags.format),
        QuotaCommands::Batch(args) => {
            let response = batch(args, ctx).await?;
            output(&response, flags.format)?;
            if !response.failed.is_empty() {
                bail!(
                    "{} of {} batch entries failed",
                    response.failed.len(),
                    response.failed.len() + response.applied.len()
                );
            }
            Ok(())
        }
    }
}

/// The numeric id behind `--id` or `--name`.
async fn resolve_id<C: QuotaControl + 'static>(
    target: &QuotaTarget,
    ctx: &AppContext<C>,
) -> anyhow::Result<u32> {
    match (target.id, &target.name) {
        (Some(id), _) => Ok(id),
        (None, Some(name)) => {
            if target.kind != EntityKind::Project {
                bail!("--name applies to project quotas only (got --type {})", target.kind);
            }
            let name = name.clone();
            let entry = ctx
                .blocking(move |engine| Ok(engine.lookup_project(&name)?))
                .await?;
            debug!(name = %entry.name, id = entry.id, "resolved project name");
            Ok(entry.id)
        }
        (None, None) => bail!("one of --id or --name is required"),
    }
}

/// Absent entities read as an all-zero record.
pub(crate) async fn get<C: QuotaControl + 'static>(
    target: &QuotaTarget,
    ctx: &AppContext<C>,
) -> anyhow::Result<QuotaRecord> {
    let id = resolve_id(target, ctx).await?;
    let kind = target.kind;
    let path = ctx.target_path(target.path.as_deref());
    ctx.blocking(move |engine| Ok(engine.get_quota_or_empty(kind, id, &path)?))
        .await
}

pub(crate) async fn set<C: QuotaControl + 'static>(
    args: &QuotaSetArgs,
    ctx: &AppContext<C>,
) -> anyhow::Result<QuotaChangeResponse> {
    let limits = build_limits(args, &ctx.config)?;
    let id = resolve_id(&args.target, ctx).await?;
    let kind = args.target.kind;
    let path = ctx.target_path(args.target.path.as_deref());

    let target = path.clone();
    ctx.blocking(move |engine| Ok(engine.set_quota(kind, id, &target, &limits)?))
        .await?;
    Ok(QuotaChangeResponse {
        kind,
        id,
        path,
        limits,
    })
}

pub(crate) async fn remove<C: QuotaControl + 'static>(
    target: &QuotaTarget,
    ctx: &AppContext<C>,
) -> anyhow::Result<QuotaChangeResponse> {
    let id = resolve_id(target, ctx).await?;
    let kind = target.kind;
    let path = ctx.target_path(target.path.as_deref());

    let on = path.clone();
    ctx.blocking(move |engine| Ok(engine.remove_quota(kind, id, &on)?))
        .await?;
    Ok(QuotaChangeResponse {
        kind,
        id,
        path,
        limits: QuotaLimits::UNLIMITED,
    })
}

pub(crate) async fn list<C: QuotaControl + 'static>(
    args: &QuotaListArgs,
    ctx: &AppContext<C>,
) -> anyhow::Result<Vec<QuotaRecord>> {
    let kind = args.kind;
    let path = ctx.target_path(args.path.as_deref());
    ctx.blocking(move |engine| Ok(engine.list_quotas(kind, &path)?))
        .await
}

/// Limits for `quota set`: the configured defaults when `--defaults` is
/// given, otherwise unlimited, with every explicit flag applied on top.
pub(crate) fn build_limits(args: &QuotaSetArgs, config: &XqkConfig) -> anyhow::Result<QuotaLimits> {
    let defaults = &config.xfs.default_limits;
    let mut limits = if args.defaults {
        match args.target.kind {
            EntityKind::User => defaults.user_limits()?,
            EntityKind::Group => defaults.group_limits()?,
            EntityKind::Project => bail!("no default limits are configured for project quotas"),
        }
    } else {
        QuotaLimits::UNLIMITED
    };

    if let Some(text) = &args.block_soft {
        limits.block_soft =
            parse_size_kb(text).with_context(|| format!("invalid --block-soft '{text}'"))?;
    }
    if let Some(text) = &args.block_hard {
        limits.block_hard =
            parse_size_kb(text).with_context(|| format!("invalid --block-hard '{text}'"))?;
    }
    if let Some(count) = args.inode_soft {
        limits.inode_soft = count;
    }
    if let Some(count) = args.inode_hard {
        limits.inode_hard = count;
    }
    Ok(limits)
}

/// One entry of a batch file. Block limits are size strings; omitted limits
/// are unlimited.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub(crate) struct BatchEntry {
    pub id: u32,
    #[serde(default)]
    pub block_soft: Option<String>,
    #[serde(default)]
    pub block_hard: Option<String>,
    #[serde(default)]
    pub inode_soft: u64,
    #[serde(default)]
    pub inode_hard: u64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BatchFile {
    #[serde(default)]
    quota: Vec<BatchEntry>,
}

/// Read batch entries: a JSON array for `.json` files, otherwise TOML
/// `[[quota]]` tables.
pub(crate) fn read_batch_file(path: &Path) -> anyhow::Result<Vec<BatchEntry>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read batch file '{}'", path.display()))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let entries = if is_json {
        serde_json::from_str::<Vec<BatchEntry>>(&content)
            .with_context(|| format!("invalid JSON batch file '{}'", path.display()))?
    } else {
        toml::from_str::<BatchFile>(&content)
            .with_context(|| format!("invalid TOML batch file '{}'", path.display()))?
            .quota
    };
    Ok(entries)
}

/// Parse entry sizes. Entries whose sizes do not parse become failures and
/// are not applied.
pub(crate) fn batch_limits(
    entries: Vec<BatchEntry>,
) -> anyhow::Result<(BTreeMap<u32, QuotaLimits>, Vec<BatchFailure>)> {
    let mut limits = BTreeMap::new();
    let mut failures = Vec::new();

    for entry in entries {
        if limits.contains_key(&entry.id) || failures.iter().any(|f: &BatchFailure| f.id == entry.id)
        {
            bail!("id {} appears more than once in the batch file", entry.id);
        }

        let parsed = parse_optional_kb(entry.block_soft.as_deref(), "block_soft").and_then(
            |block_soft| {
                parse_optional_kb(entry.block_hard.as_deref(), "block_hard").map(|block_hard| {
                    QuotaLimits {
                        block_soft,
                        block_hard,
                        inode_soft: entry.inode_soft,
                        inode_hard: entry.inode_hard,
                    }
                })
            },
        );

        match parsed {
            Ok(value) => {
                limits.insert(entry.id, value);
            }
            Err((kind, error)) => failures.push(BatchFailure {
                id: entry.id,
                kind,
                error,
            }),
        }
    }
    Ok((limits, failures))
}

fn parse_optional_kb(text: Option<&str>, field: &str) -> Result<u64, (ErrorKind, String)> {
    text.map_or(Ok(0), |text| {
        parse_size_kb(text).map_err(|e| (e.kind(), format!("invalid {field} '{text}': {e}")))
    })
}

pub(crate) async fn batch<C: QuotaControl + 'static>(
    args: &QuotaBatchArgs,
    ctx: &AppContext<C>,
) -> anyhow::Result<BatchResponse> {
    let (entries, mut failed) = batch_limits(read_batch_file(&args.file)?)?;
    let kind = args.kind;
    let path = ctx.target_path(args.path.as_deref());

    let (applied, rejected) = ctx
        .blocking(move |engine| match engine.set_batch(kind, &path, &entries) {
            Ok(outcome) => Ok((outcome.applied, Vec::new())),
            Err(batch) => {
                let rejected = batch
                    .failures
                    .into_iter()
                    .map(|entry| BatchFailure {
                        id: entry.id,
                        kind: entry.error.kind(),
                        error: error_chain(&entry.error.cause),
                    })
                    .collect::<Vec<_>>();
                Ok((batch.applied, rejected))
            }
        })
        .await?;

    failed.extend(rejected);
    failed.sort_by_key(|failure| failure.id);
    Ok(BatchResponse { applied, failed })
}

/// Display an error followed by each of its sources, `: ` separated.
fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::commands::testing::{DEVICE, Sandbox};

    fn target(kind: EntityKind, id: Option<u32>, name: Option<&str>) -> QuotaTarget {
        QuotaTarget {
            path: None,
            kind,
            id,
            name: name.map(str::to_string),
        }
    }

    fn set_args(kind: EntityKind, id: u32) -> QuotaSetArgs {
        QuotaSetArgs {
            target: target(kind, Some(id), None),
            block_soft: None,
            block_hard: None,
            inode_soft: None,
            inode_hard: None,
            defaults: false,
        }
    }

    #[test]
    fn explicit_flags_override_configured_defaults() {
        let mut args = set_args(EntityKind::User, 1001);
        args.defaults = true;
        args.block_hard = Some("4GB".into());

        let limits = build_limits(&args, &XqkConfig::default()).unwrap();
        assert_eq!(
            limits,
            QuotaLimits {
                block_soft: 1_048_576,
                block_hard: 4_194_304,
                inode_soft: 100_000,
                inode_hard: 200_000,
            }
        );
    }

    #[test]
    fn without_defaults_unset_limits_are_unlimited() {
        let mut args = set_args(EntityKind::Group, 10);
        args.inode_hard = Some(5000);
        let limits = build_limits(&args, &XqkConfig::default()).unwrap();
        assert_eq!(
            limits,
            QuotaLimits {
                inode_hard: 5000,
                ..QuotaLimits::UNLIMITED
            }
        );
    }

    #[test]
    fn project_defaults_are_rejected() {
        let mut args = set_args(EntityKind::Project, 1000);
        args.defaults = true;
        let err = build_limits(&args, &XqkConfig::default()).unwrap_err();
        assert!(err.to_string().contains("project"));
    }

    #[test]
    fn bad_size_names_the_flag() {
        let mut args = set_args(EntityKind::User, 1);
        args.block_soft = Some("lots".into());
        let err = build_limits(&args, &XqkConfig::default()).unwrap_err();
        assert_eq!(err.to_string(), "invalid --block-soft 'lots'");
    }

    #[test]
    fn batch_file_formats_follow_extension() {
        let sandbox = Sandbox::new();
        let toml_file = sandbox.write(
            "batch.toml",
            "[[quota]]\nid = 1001\nblock_hard = \"1GB\"\n\n[[quota]]\nid = 1002\ninode_hard = 10\n",
        );
        let json_file = sandbox.write(
            "batch.json",
            r#"[{"id": 1001, "block_hard": "1GB"}, {"id": 1002, "inode_hard": 10}]"#,
        );

        let from_toml = read_batch_file(&toml_file).unwrap();
        let from_json = read_batch_file(&json_file).unwrap();
        assert_eq!(from_toml, from_json);
        assert_eq!(from_toml.len(), 2);
        assert_eq!(from_toml[0].block_hard.as_deref(), Some("1GB"));
        assert_eq!(from_toml[1].inode_hard, 10);
    }

    #[test]
    fn batch_file_rejects_unknown_fields() {
        let sandbox = Sandbox::new();
        let file = sandbox.write("batch.toml", "[[quota]]\nid = 1\nblock_max = \"1GB\"\n");
        assert!(read_batch_file(&file).is_err());
    }

    #[test]
    fn unparseable_sizes_become_failures() {
        let entries = vec![
            BatchEntry {
                id: 2,
                block_soft: Some("-1GB".into()),
                block_hard: None,
                inode_soft: 0,
                inode_hard: 0,
            },
            BatchEntry {
                id: 1,
                block_soft: None,
                block_hard: Some("2MB".into()),
                inode_soft: 0,
                inode_hard: 0,
            },
        ];
        let (limits, failures) = batch_limits(entries).unwrap();
        assert_eq!(limits.keys().copied().collect::<Vec<_>>(), vec![1]);
        assert_eq!(limits[&1].block_hard, 2048);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].id, 2);
        assert_eq!(failures[0].kind, ErrorKind::NegativeSize);
        assert!(failures[0].error.starts_with("invalid block_soft '-1GB'"));
    }

    #[test]
    fn duplicate_batch_ids_are_rejected() {
        let entry = || BatchEntry {
            id: 7,
            block_soft: None,
            block_hard: None,
            inode_soft: 0,
            inode_hard: 1,
        };
        assert!(batch_limits(vec![entry(), entry()]).is_err());
    }

    #[tokio::test]
    async fn set_then_get_round_trips_through_the_engine() {
        let sandbox = Sandbox::new();
        let mut args = set_args(EntityKind::User, 1001);
        args.block_soft = Some("1GB".into());
        args.block_hard = Some("2GB".into());

        let response = set(&args, &sandbox.ctx).await.unwrap();
        assert_eq!(response.path, sandbox.root);
        assert_eq!(response.limits.block_hard, 2_097_152);

        sandbox
            .control()
            .set_usage(EntityKind::User, 1001, DEVICE, 512, 3);
        let record = get(&args.target, &sandbox.ctx).await.unwrap();
        assert_eq!(record.block_soft, 1_048_576);
        assert_eq!(record.block_used, 512);
        assert_eq!(record.device, DEVICE);
    }

    #[tokio::test]
    async fn get_of_unknown_entity_is_all_zero() {
        let sandbox = Sandbox::new();
        let record = get(&target(EntityKind::Group, Some(4242), None), &sandbox.ctx)
            .await
            .unwrap();
        assert_eq!(record.id, 4242);
        assert!(record.limits().is_unlimited());
        assert_eq!(record.block_used, 0);
    }

    #[tokio::test]
    async fn remove_clears_limits_and_drops_from_list() {
        let sandbox = Sandbox::new();
        let mut args = set_args(EntityKind::User, 1001);
        args.inode_hard = Some(10);
        set(&args, &sandbox.ctx).await.unwrap();

        let list_args = QuotaListArgs {
            path: None,
            kind: EntityKind::User,
        };
        assert_eq!(list(&list_args, &sandbox.ctx).await.unwrap().len(), 1);

        let response = remove(&args.target, &sandbox.ctx).await.unwrap();
        assert!(response.limits.is_unlimited());
        assert!(list(&list_args, &sandbox.ctx).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn project_name_resolves_through_registry() {
        let sandbox = Sandbox::new();
        let project = sandbox.path("web");
        let entry = sandbox
            .ctx
            .blocking(move |engine| Ok(engine.create_project("web", &project)?))
            .await
            .unwrap();

        let mut args = set_args(EntityKind::Project, 0);
        args.target = target(EntityKind::Project, None, Some("web"));
        args.block_hard = Some("10GB".into());
        let response = set(&args, &sandbox.ctx).await.unwrap();
        assert_eq!(response.id, entry.id);
        assert_eq!(response.id, 1000);

        let err = get(&target(EntityKind::User, None, Some("web")), &sandbox.ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("project quotas only"));

        let err = get(&target(EntityKind::Project, None, Some("db")), &sandbox.ctx)
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("project 'db' not found"));
    }

    #[tokio::test]
    async fn batch_reports_every_entry() {
        let sandbox = Sandbox::new();
        let file = sandbox.write(
            "batch.toml",
            "\
[[quota]]
id = 1001
block_soft = \"1GB\"
block_hard = \"2GB\"

[[quota]]
id = 1002
block_soft = \"3GB\"
block_hard = \"2GB\"

[[quota]]
id = 1003
block_hard = \"two gigs\"

[[quota]]
id = 1004
inode_hard = 100
",
        );
        let args = QuotaBatchArgs {
            path: None,
            kind: EntityKind::User,
            file,
        };

        let response = batch(&args, &sandbox.ctx).await.unwrap();
        assert_eq!(response.applied, vec![1001, 1004]);
        let failed: Vec<_> = response.failed.iter().map(|f| (f.id, f.kind)).collect();
        assert_eq!(
            failed,
            vec![(1002, ErrorKind::InvalidLimits), (1003, ErrorKind::InvalidFormat)]
        );
        assert_eq!(
            response.failed[0].error,
            "block soft limit 3145728 KB exceeds hard limit 2097152 KB"
        );
    }
}
