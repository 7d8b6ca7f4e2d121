use std::path::Path;

use xqk_core::entities::ProjectEntry;
use xqk_core::responses::ProjectRemoveResponse;
use xqk_quota::QuotaControl;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::ProjectCommands;
use crate::context::AppContext;
use crate::output::output;

/// Handle `xfs-quota-kit project`.
pub async fn handle<C: QuotaControl + 'static>(
    action: &ProjectCommands,
    ctx: &AppContext<C>,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match action {
        ProjectCommands::Create { name, path } => {
            output(&create(name, path, ctx).await?, flags.format)
        }
        ProjectCommands::Remove { name } => output(&remove(name, ctx).await?, flags.format),
        ProjectCommands::List => output(&list(ctx).await?, flags.format),
    }
}

pub(crate) async fn create<C: QuotaControl + 'static>(
    name: &str,
    path: &Path,
    ctx: &AppContext<C>,
) -> anyhow::Result<ProjectEntry> {
    let name = name.to_string();
    let path = path.to_path_buf();
    ctx.blocking(move |engine| Ok(engine.create_project(&name, &path)?))
        .await
}

pub(crate) async fn remove<C: QuotaControl + 'static>(
    name: &str,
    ctx: &AppContext<C>,
) -> anyhow::Result<ProjectRemoveResponse> {
    let owned = name.to_string();
    let entry = ctx
        .blocking(move |engine| Ok(engine.remove_project(&owned)?))
        .await?;
    Ok(ProjectRemoveResponse {
        name: entry.name,
        removed: true,
    })
}

pub(crate) async fn list<C: QuotaControl + 'static>(
    ctx: &AppContext<C>,
) -> anyhow::Result<Vec<ProjectEntry>> {
    ctx.blocking(|engine| Ok(engine.list_projects()?)).await
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::commands::testing::Sandbox;

    #[tokio::test]
    async fn create_list_remove_cycle() {
        let sandbox = Sandbox::new();
        let web = create("web", &sandbox.path("web"), &sandbox.ctx).await.unwrap();
        let db = create("db", &sandbox.path("db"), &sandbox.ctx).await.unwrap();
        assert_eq!((web.id, db.id), (1000, 1001));
        assert!(sandbox.exists("web"));
        assert_eq!(
            sandbox.control().assignments(),
            vec![(sandbox.path("web"), 1000), (sandbox.path("db"), 1001)]
        );

        let names: Vec<_> = list(&sandbox.ctx)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"web".to_string()));

        let removed = remove("web", &sandbox.ctx).await.unwrap();
        assert_eq!(
            removed,
            ProjectRemoveResponse {
                name: "web".into(),
                removed: true
            }
        );
        assert!(!sandbox.read("projid").contains("web:"));

        let next = create("cache", &sandbox.path("cache"), &sandbox.ctx).await.unwrap();
        assert_eq!(next.id, 1002);
    }

    #[tokio::test]
    async fn duplicate_and_missing_names_fail() {
        let sandbox = Sandbox::new();
        create("web", &sandbox.path("web"), &sandbox.ctx).await.unwrap();

        let err = create("web", &sandbox.path("other"), &sandbox.ctx)
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("project 'web' already exists"));

        let err = remove("ghost", &sandbox.ctx).await.unwrap_err();
        assert!(format!("{err:#}").contains("project 'ghost' not found"));
    }

    #[tokio::test]
    async fn auto_create_disabled_requires_existing_directory() {
        let mut config = xqk_config::XqkConfig::default();
        config.xfs.auto_create = false;
        let sandbox = Sandbox::with_config(config);

        assert!(create("web", &sandbox.path("web"), &sandbox.ctx).await.is_err());
        assert!(!sandbox.exists("web"));
        assert!(sandbox.read("projid").is_empty());
    }
}
