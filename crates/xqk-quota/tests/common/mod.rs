#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use xqk_quota::{EngineSettings, MemoryQuotaControl, QuotaEngine};

pub const DEVICE: &str = "/dev/sdb1";

/// A temp directory posing as a mounted XFS filesystem, with its own mount
/// table and project registry.
pub struct Sandbox {
    _dir: TempDir,
    pub root: PathBuf,
    pub settings: EngineSettings,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = std::fs::canonicalize(dir.path()).expect("canonical tempdir");
        let mounts = root.join("mounts");
        std::fs::write(
            &mounts,
            format!("{DEVICE} {} xfs rw,usrquota,grpquota,prjquota 0 0\n", root.display()),
        )
        .expect("write mounts");
        let settings = EngineSettings {
            mounts_file: mounts,
            projects_file: root.join("projects"),
            projid_file: root.join("projid"),
            lock_timeout: Duration::from_secs(5),
            ..EngineSettings::default()
        };
        Self {
            _dir: dir,
            root,
            settings,
        }
    }

    pub fn engine(&self) -> QuotaEngine<MemoryQuotaControl> {
        QuotaEngine::new(MemoryQuotaControl::new(), &self.settings)
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    pub fn read(&self, file: &Path) -> String {
        std::fs::read_to_string(file).unwrap_or_default()
    }
}
