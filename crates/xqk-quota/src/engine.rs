//! The quota engine: every user-facing operation, composed from device
//! resolution, the quota channel and the project registry.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};
use xqk_core::entities::{
    FilesystemInfo, ProjectEntry, QuotaAccounting, QuotaLimits, QuotaRecord, QuotaReport,
};
use xqk_core::enums::EntityKind;

use crate::control::{DiskQuota, QuotaControl};
use crate::error::{
    BatchError, BatchOutcome, Cause, ControlError, FailedEntry, Operation, QuotaError,
};
use crate::fsstat;
use crate::mounts::{DEFAULT_MOUNTS_FILE, MountTable, Resolved};
use crate::registry::{DEFAULT_FIRST_PROJECT_ID, DEFAULT_LOCK_TIMEOUT, ProjectRegistry};

/// Where the engine finds the mount table and the project registry.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub mounts_file: PathBuf,
    pub projects_file: PathBuf,
    pub projid_file: PathBuf,
    pub first_project_id: u32,
    pub auto_create: bool,
    pub lock_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            mounts_file: PathBuf::from(DEFAULT_MOUNTS_FILE),
            projects_file: PathBuf::from("/etc/projects"),
            projid_file: PathBuf::from("/etc/projid"),
            first_project_id: DEFAULT_FIRST_PROJECT_ID,
            auto_create: true,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

pub struct QuotaEngine<C> {
    control: C,
    mounts: MountTable,
    registry: ProjectRegistry,
}

impl<C: QuotaControl> QuotaEngine<C> {
    pub fn new(control: C, settings: &EngineSettings) -> Self {
        let registry = ProjectRegistry::new(&settings.projects_file, &settings.projid_file)
            .with_first_id(settings.first_project_id)
            .with_auto_create(settings.auto_create)
            .with_lock_timeout(settings.lock_timeout);
        Self {
            control,
            mounts: MountTable::new(&settings.mounts_file),
            registry,
        }
    }

    pub const fn control(&self) -> &C {
        &self.control
    }

    pub const fn registry(&self) -> &ProjectRegistry {
        &self.registry
    }

    fn resolve(&self, op: Operation, path: &Path) -> Result<Resolved, QuotaError> {
        self.mounts
            .resolve(path)
            .map_err(|e| QuotaError::new(op, path, e))
    }

    /// Current usage and limits for one entity.
    ///
    /// # Errors
    ///
    /// `NoSuchEntity` when the kernel holds no record for the id; resolution
    /// and kernel failures otherwise.
    pub fn get_quota(
        &self,
        kind: EntityKind,
        id: u32,
        path: &Path,
    ) -> Result<QuotaRecord, QuotaError> {
        let resolved = self.resolve(Operation::Get, path)?;
        let dquot = self
            .control
            .get(kind, id, &resolved.mount.device)
            .map_err(|e| QuotaError::new(Operation::Get, path, e))?;
        Ok(to_record(kind, &resolved, &dquot))
    }

    /// Like [`QuotaEngine::get_quota`], but an absent entity yields an
    /// all-zero record.
    ///
    /// # Errors
    ///
    /// Resolution and kernel failures other than `NoSuchEntity`.
    pub fn get_quota_or_empty(
        &self,
        kind: EntityKind,
        id: u32,
        path: &Path,
    ) -> Result<QuotaRecord, QuotaError> {
        match self.get_quota(kind, id, path) {
            Err(err) if err.is_no_such_entity() => {
                let resolved = self.resolve(Operation::Get, path)?;
                Ok(QuotaRecord::empty(
                    kind,
                    id,
                    resolved.path,
                    resolved.mount.device,
                ))
            }
            other => other,
        }
    }

    /// Replace the limits of one entity. Limits are validated before the
    /// device is touched.
    ///
    /// # Errors
    ///
    /// `InvalidLimits`, resolution and kernel failures.
    pub fn set_quota(
        &self,
        kind: EntityKind,
        id: u32,
        path: &Path,
        limits: &QuotaLimits,
    ) -> Result<(), QuotaError> {
        limits
            .validate()
            .map_err(|e| QuotaError::new(Operation::Set, path, ControlError::from(e)))?;
        let resolved = self.resolve(Operation::Set, path)?;
        self.control
            .set(kind, id, &resolved.mount.device, limits)
            .map_err(|e| QuotaError::new(Operation::Set, path, e))?;
        info!(%kind, id, device = %resolved.mount.device, ?limits, "quota set");
        Ok(())
    }

    /// Clear all four limits of one entity. Usage is untouched.
    ///
    /// # Errors
    ///
    /// Resolution and kernel failures.
    pub fn remove_quota(&self, kind: EntityKind, id: u32, path: &Path) -> Result<(), QuotaError> {
        let resolved = self.resolve(Operation::Remove, path)?;
        self.control
            .remove(kind, id, &resolved.mount.device)
            .map_err(|e| QuotaError::new(Operation::Remove, path, e))?;
        info!(%kind, id, device = %resolved.mount.device, "quota removed");
        Ok(())
    }

    /// Every entity of `kind` the kernel holds a record for, ordered by id.
    /// Ids that vanish between enumeration and read are skipped.
    ///
    /// # Errors
    ///
    /// Resolution and kernel failures.
    pub fn list_quotas(&self, kind: EntityKind, path: &Path) -> Result<Vec<QuotaRecord>, QuotaError> {
        let resolved = self.resolve(Operation::List, path)?;
        let device = &resolved.mount.device;
        let ids = self
            .control
            .ids(kind, device)
            .map_err(|e| QuotaError::new(Operation::List, path, e))?;

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            match self.control.get(kind, id, device) {
                Ok(dquot) => records.push(to_record(kind, &resolved, &dquot)),
                Err(ControlError::NoSuchEntity { .. }) => {
                    debug!(%kind, id, device = %device, "quota vanished during listing");
                }
                Err(err) => return Err(QuotaError::new(Operation::List, path, err)),
            }
        }
        records.sort_by_key(|r| r.id);
        Ok(records)
    }

    /// Apply `set_quota` to each entry independently. A failing entry does
    /// not stop the others.
    ///
    /// # Errors
    ///
    /// `BatchError` listing every failed id with its error, plus the ids that
    /// were applied.
    pub fn set_batch(
        &self,
        kind: EntityKind,
        path: &Path,
        entries: &BTreeMap<u32, QuotaLimits>,
    ) -> Result<BatchOutcome, BatchError> {
        let mut applied = Vec::new();
        let mut failures = Vec::new();
        for (&id, limits) in entries {
            match self.set_quota(kind, id, path, limits) {
                Ok(()) => applied.push(id),
                Err(error) => {
                    warn!(%kind, id, error = %error.cause, "batch entry failed");
                    failures.push(FailedEntry {
                        id,
                        error: error.with_op(Operation::Batch),
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(BatchOutcome { applied })
        } else {
            Err(BatchError {
                path: path.to_path_buf(),
                applied,
                failures,
            })
        }
    }

    /// Records of every kind on the filesystem, with summary counts. Kinds
    /// whose accounting is disabled are skipped.
    ///
    /// # Errors
    ///
    /// Resolution and kernel failures other than disabled accounting.
    pub fn generate_report(&self, path: &Path) -> Result<QuotaReport, QuotaError> {
        let resolved = self.resolve(Operation::Report, path)?;
        let mut records = Vec::new();
        for kind in EntityKind::ALL {
            match self.list_quotas(kind, path) {
                Ok(mut found) => records.append(&mut found),
                Err(err) if err.is_accounting_disabled() => {
                    warn!(%kind, device = %resolved.mount.device, "accounting disabled; skipping");
                }
                Err(err) => return Err(err.with_op(Operation::Report)),
            }
        }
        Ok(QuotaReport::from_records(resolved.path, records))
    }

    /// # Errors
    ///
    /// `IoFailure` if the path cannot be stat'ed.
    pub fn is_xfs(&self, path: &Path) -> Result<bool, QuotaError> {
        fsstat::is_xfs(path).map_err(|e| QuotaError::new(Operation::Status, path, e))
    }

    /// Succeeds only when `path` lives on XFS.
    ///
    /// # Errors
    ///
    /// `NotXfs` for any other filesystem, `IoFailure` if it cannot be stat'ed.
    pub fn check_status(&self, path: &Path) -> Result<(), QuotaError> {
        if self.is_xfs(path)? {
            Ok(())
        } else {
            Err(QuotaError::new(
                Operation::Status,
                path,
                Cause::NotXfs(path.to_path_buf()),
            ))
        }
    }

    /// Device, mount and capacity details for the filesystem holding `path`.
    ///
    /// # Errors
    ///
    /// Resolution failures and `IoFailure` from `statfs`.
    pub fn filesystem_info(&self, path: &Path) -> Result<FilesystemInfo, QuotaError> {
        let resolved = self.resolve(Operation::FilesystemInfo, path)?;
        let stats = fsstat::statfs(&resolved.path)
            .map_err(|e| QuotaError::new(Operation::FilesystemInfo, path, e))?;
        Ok(FilesystemInfo {
            quota_accounting: QuotaAccounting::from_mount_options(&resolved.mount.options),
            path: resolved.path,
            device: resolved.mount.device,
            mount_point: resolved.mount.mount_point,
            fs_type: resolved.mount.fs_type,
            fs_magic: stats.magic_hex(),
            is_xfs: stats.is_xfs(),
            block_size: stats.block_size,
            total_bytes: stats.total_bytes(),
            used_bytes: stats.used_bytes(),
            free_bytes: stats.free_bytes(),
            total_inodes: stats.files,
            free_inodes: stats.files_free,
        })
    }

    /// Register `name` for `path` and tag the directory with the new id.
    ///
    /// # Errors
    ///
    /// Registry failures and kernel failures from the directory tagging.
    pub fn create_project(&self, name: &str, path: &Path) -> Result<ProjectEntry, QuotaError> {
        self.registry
            .create(name, path, |dir, id| self.control.assign_project(dir, id))
            .map_err(|e| QuotaError::new(Operation::CreateProject, path, e))
    }

    /// # Errors
    ///
    /// `NotFound` and registry failures.
    pub fn remove_project(&self, name: &str) -> Result<ProjectEntry, QuotaError> {
        self.registry
            .remove(name)
            .map_err(|e| QuotaError::new(Operation::RemoveProject, self.registry.projid_file(), e))
    }

    /// # Errors
    ///
    /// Registry read and corruption failures.
    pub fn list_projects(&self) -> Result<Vec<ProjectEntry>, QuotaError> {
        self.registry
            .list()
            .map_err(|e| QuotaError::new(Operation::ListProjects, self.registry.projid_file(), e))
    }

    /// # Errors
    ///
    /// `NotFound` and registry failures.
    pub fn lookup_project(&self, name: &str) -> Result<ProjectEntry, QuotaError> {
        self.registry
            .lookup(name)
            .map_err(|e| QuotaError::new(Operation::LookupProject, self.registry.projid_file(), e))
    }
}

fn to_record(kind: EntityKind, resolved: &Resolved, dquot: &DiskQuota) -> QuotaRecord {
    QuotaRecord {
        id: dquot.id,
        kind,
        path: resolved.path.clone(),
        device: resolved.mount.device.clone(),
        block_used: dquot.block_used,
        block_soft: dquot.limits.block_soft,
        block_hard: dquot.limits.block_hard,
        inode_used: dquot.inode_used,
        inode_soft: dquot.limits.inode_soft,
        inode_hard: dquot.limits.inode_hard,
        last_updated: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::MemoryQuotaControl;
    use pretty_assertions::assert_eq;
    use xqk_core::errors::ErrorKind;

    struct Fixture {
        _dir: tempfile::TempDir,
        root: PathBuf,
        engine: QuotaEngine<MemoryQuotaControl>,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let root = std::fs::canonicalize(dir.path()).unwrap();
        let mounts = root.join("mounts");
        std::fs::write(
            &mounts,
            format!("/dev/sdb1 {} xfs rw,usrquota,prjquota 0 0\n", root.display()),
        )
        .unwrap();
        let settings = EngineSettings {
            mounts_file: mounts,
            projects_file: root.join("projects"),
            projid_file: root.join("projid"),
            lock_timeout: Duration::from_millis(500),
            ..EngineSettings::default()
        };
        Fixture {
            engine: QuotaEngine::new(MemoryQuotaControl::new(), &settings),
            root,
            _dir: dir,
        }
    }

    const LIMITS: QuotaLimits = QuotaLimits {
        block_soft: 1_048_576,
        block_hard: 2_097_152,
        inode_soft: 100_000,
        inode_hard: 200_000,
    };

    #[test]
    fn set_then_get_returns_limits_and_device() {
        let f = fixture();
        f.engine.set_quota(EntityKind::User, 1001, &f.root, &LIMITS).unwrap();
        let record = f.engine.get_quota(EntityKind::User, 1001, &f.root).unwrap();
        assert_eq!(record.limits(), LIMITS);
        assert_eq!(record.device, "/dev/sdb1");
        assert_eq!(record.path, f.root);
        assert_eq!(record.kind, EntityKind::User);
    }

    #[test]
    fn get_absent_entity_is_no_such_entity() {
        let f = fixture();
        let err = f.engine.get_quota(EntityKind::Group, 77, &f.root).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoSuchEntity);
        assert_eq!(err.op, Operation::Get);

        let empty = f
            .engine
            .get_quota_or_empty(EntityKind::Group, 77, &f.root)
            .unwrap();
        assert_eq!(empty.limits(), QuotaLimits::UNLIMITED);
        assert_eq!(empty.block_used, 0);
    }

    #[test]
    fn invalid_limits_never_reach_the_device() {
        let f = fixture();
        let bad = QuotaLimits {
            inode_soft: 10,
            inode_hard: 5,
            ..QuotaLimits::default()
        };
        let err = f
            .engine
            .set_quota(EntityKind::User, 1, Path::new("/not/mounted/anywhere"), &bad)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidLimits);
    }

    #[test]
    fn unmounted_path_is_not_mounted() {
        let dir = tempfile::tempdir().unwrap();
        let mounts = dir.path().join("mounts");
        std::fs::write(&mounts, "/dev/sdb1 /nowhere/special xfs rw 0 0\n").unwrap();
        let settings = EngineSettings {
            mounts_file: mounts,
            ..EngineSettings::default()
        };
        let engine = QuotaEngine::new(MemoryQuotaControl::new(), &settings);
        let err = engine
            .remove_quota(EntityKind::User, 1, dir.path())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotMounted);
    }

    #[test]
    fn remove_keeps_usage_and_clears_limits() {
        let f = fixture();
        f.engine
            .control()
            .set_usage(EntityKind::Project, 1000, "/dev/sdb1", 4096, 12);
        f.engine
            .set_quota(EntityKind::Project, 1000, &f.root, &LIMITS)
            .unwrap();
        f.engine.remove_quota(EntityKind::Project, 1000, &f.root).unwrap();
        let record = f.engine.get_quota(EntityKind::Project, 1000, &f.root).unwrap();
        assert_eq!(record.limits(), QuotaLimits::UNLIMITED);
        assert_eq!(record.block_used, 4096);
        assert_eq!(record.inode_used, 12);
    }

    #[test]
    fn list_is_sorted_and_scoped_by_kind() {
        let f = fixture();
        for id in [1003, 1001, 1002] {
            f.engine.set_quota(EntityKind::User, id, &f.root, &LIMITS).unwrap();
        }
        f.engine.set_quota(EntityKind::Group, 5, &f.root, &LIMITS).unwrap();
        let ids: Vec<u32> = f
            .engine
            .list_quotas(EntityKind::User, &f.root)
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![1001, 1002, 1003]);
    }

    #[test]
    fn report_skips_disabled_accounting() {
        let f = fixture();
        f.engine.set_quota(EntityKind::User, 1, &f.root, &LIMITS).unwrap();
        f.engine
            .control()
            .disable_accounting(EntityKind::Group, "/dev/sdb1");
        let report = f.engine.generate_report(&f.root).unwrap();
        assert_eq!(report.total_quotas, 1);
        assert_eq!(report.filesystem, f.root);
    }

    #[test]
    fn filesystem_info_reflects_mount_options() {
        let f = fixture();
        let info = f.engine.filesystem_info(&f.root).unwrap();
        assert_eq!(info.device, "/dev/sdb1");
        assert_eq!(info.fs_type, "xfs");
        assert_eq!(info.mount_point, f.root);
        assert!(info.quota_accounting.user);
        assert!(!info.quota_accounting.group);
        assert!(info.quota_accounting.project);
        assert!(info.block_size > 0);
    }

    #[test]
    fn check_status_on_missing_path_is_io_failure() {
        let f = fixture();
        let err = f
            .engine
            .check_status(&f.root.join("does/not/exist"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IoFailure);
    }

    #[test]
    fn create_project_tags_directory() {
        let f = fixture();
        let dir = f.root.join("web");
        let entry = f.engine.create_project("web", &dir).unwrap();
        assert_eq!(entry.id, 1000);
        assert_eq!(f.engine.control().assignments(), vec![(dir, 1000)]);
        assert_eq!(f.engine.lookup_project("web").unwrap(), entry);
    }
}
