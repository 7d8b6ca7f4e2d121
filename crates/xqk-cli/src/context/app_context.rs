use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use xqk_config::{XfsConfig, XqkConfig};
use xqk_quota::{EngineSettings, QuotaControl, QuotaEngine, XfsQuotaControl};

/// Shared application resources initialized once at startup.
pub struct AppContext<C = XfsQuotaControl> {
    pub config: XqkConfig,
    pub engine: Arc<QuotaEngine<C>>,
}

impl AppContext<XfsQuotaControl> {
    /// Context backed by the kernel quota interface.
    #[must_use]
    pub fn init(config: XqkConfig) -> Self {
        Self::with_control(config, XfsQuotaControl::new())
    }
}

impl<C: QuotaControl + 'static> AppContext<C> {
    pub fn with_control(config: XqkConfig, control: C) -> Self {
        let engine = QuotaEngine::new(control, &engine_settings(&config.xfs));
        Self {
            config,
            engine: Arc::new(engine),
        }
    }

    /// `path`, or `xfs.default_path` when the command was given none.
    #[must_use]
    pub fn target_path(&self, path: Option<&Path>) -> PathBuf {
        path.map_or_else(|| PathBuf::from(&self.config.xfs.default_path), Path::to_path_buf)
    }

    /// Run an engine call on the blocking pool. Quota and registry calls
    /// issue syscalls and take file locks.
    pub async fn blocking<T, F>(&self, call: F) -> anyhow::Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&QuotaEngine<C>) -> anyhow::Result<T> + Send + 'static,
    {
        let engine = Arc::clone(&self.engine);
        tokio::task::spawn_blocking(move || call(&engine))
            .await
            .context("quota engine task panicked")?
    }
}

/// Engine settings from the `[xfs]` config section.
#[must_use]
pub fn engine_settings(xfs: &XfsConfig) -> EngineSettings {
    EngineSettings {
        mounts_file: PathBuf::from(&xfs.mounts_file),
        projects_file: PathBuf::from(&xfs.projects_file),
        projid_file: PathBuf::from(&xfs.projid_file),
        first_project_id: xfs.first_project_id,
        auto_create: xfs.auto_create,
        lock_timeout: Duration::from_secs(xfs.lock_timeout_secs),
    }
}
