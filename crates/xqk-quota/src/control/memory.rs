//! In-process quota control that mirrors the kernel's observable behavior.
//!
//! A dquot with no limits and no usage does not exist, exactly as on XFS:
//! clearing the limits of an entity that owns nothing makes it vanish from
//! `get` and `ids`.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use xqk_core::entities::QuotaLimits;
use xqk_core::enums::EntityKind;

use super::{DiskQuota, QuotaControl};
use crate::error::ControlError;

type Key = (String, EntityKind, u32);

#[derive(Debug, Default)]
struct State {
    dquots: BTreeMap<Key, DiskQuota>,
    disabled: BTreeSet<(String, EntityKind)>,
    assignments: Vec<(PathBuf, u32)>,
}

#[derive(Debug, Default)]
pub struct MemoryQuotaControl {
    state: Mutex<State>,
}

impl MemoryQuotaControl {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record usage for an id, creating the dquot if needed.
    pub fn set_usage(
        &self,
        kind: EntityKind,
        id: u32,
        device: &str,
        block_used_kb: u64,
        inode_used: u64,
    ) {
        let mut state = self.state();
        let dquot = state
            .dquots
            .entry((device.to_string(), kind, id))
            .or_insert_with(|| DiskQuota {
                id,
                ..DiskQuota::default()
            });
        dquot.block_used = block_used_kb;
        dquot.inode_used = inode_used;
        prune(&mut state, &(device.to_string(), kind, id));
    }

    /// Make every call for `kind` on `device` fail as if accounting were off.
    pub fn disable_accounting(&self, kind: EntityKind, device: &str) {
        self.state().disabled.insert((device.to_string(), kind));
    }

    /// Directories tagged through `assign_project`, in call order.
    #[must_use]
    pub fn assignments(&self) -> Vec<(PathBuf, u32)> {
        self.state().assignments.clone()
    }

    fn check_enabled(state: &State, kind: EntityKind, device: &str) -> Result<(), ControlError> {
        if state.disabled.contains(&(device.to_string(), kind)) {
            return Err(ControlError::NotEnabled {
                kind,
                device: device.to_string(),
            });
        }
        Ok(())
    }
}

fn prune(state: &mut State, key: &Key) {
    if state
        .dquots
        .get(key)
        .is_some_and(|d| d.limits.is_unlimited() && d.block_used == 0 && d.inode_used == 0)
    {
        state.dquots.remove(key);
    }
}

impl QuotaControl for MemoryQuotaControl {
    fn get(&self, kind: EntityKind, id: u32, device: &str) -> Result<DiskQuota, ControlError> {
        let state = self.state();
        Self::check_enabled(&state, kind, device)?;
        state
            .dquots
            .get(&(device.to_string(), kind, id))
            .copied()
            .ok_or_else(|| ControlError::NoSuchEntity {
                kind,
                id,
                device: device.to_string(),
            })
    }

    fn set(
        &self,
        kind: EntityKind,
        id: u32,
        device: &str,
        limits: &QuotaLimits,
    ) -> Result<(), ControlError> {
        limits.validate()?;
        let mut state = self.state();
        Self::check_enabled(&state, kind, device)?;
        let key = (device.to_string(), kind, id);
        state
            .dquots
            .entry(key.clone())
            .or_insert_with(|| DiskQuota {
                id,
                ..DiskQuota::default()
            })
            .limits = *limits;
        prune(&mut state, &key);
        Ok(())
    }

    fn ids(&self, kind: EntityKind, device: &str) -> Result<Vec<u32>, ControlError> {
        let state = self.state();
        Self::check_enabled(&state, kind, device)?;
        Ok(state
            .dquots
            .keys()
            .filter(|(dev, k, _)| dev == device && *k == kind)
            .map(|(_, _, id)| *id)
            .collect())
    }

    fn assign_project(&self, dir: &Path, id: u32) -> Result<(), ControlError> {
        self.state().assignments.push((dir.to_path_buf(), id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DEV: &str = "/dev/sdb1";

    #[test]
    fn set_then_get_round_trips_limits() {
        let control = MemoryQuotaControl::new();
        let limits = QuotaLimits {
            block_soft: 1024,
            block_hard: 2048,
            inode_soft: 10,
            inode_hard: 20,
        };
        control.set(EntityKind::User, 1001, DEV, &limits).unwrap();
        let dquot = control.get(EntityKind::User, 1001, DEV).unwrap();
        assert_eq!(dquot.limits, limits);
        assert_eq!(dquot.id, 1001);
    }

    #[test]
    fn remove_without_usage_drops_the_dquot() {
        let control = MemoryQuotaControl::new();
        let limits = QuotaLimits {
            block_hard: 2048,
            ..QuotaLimits::default()
        };
        control.set(EntityKind::Group, 50, DEV, &limits).unwrap();
        control.remove(EntityKind::Group, 50, DEV).unwrap();
        assert!(matches!(
            control.get(EntityKind::Group, 50, DEV),
            Err(ControlError::NoSuchEntity { .. })
        ));
    }

    #[test]
    fn remove_keeps_usage() {
        let control = MemoryQuotaControl::new();
        control.set_usage(EntityKind::User, 7, DEV, 500, 3);
        control
            .set(
                EntityKind::User,
                7,
                DEV,
                &QuotaLimits {
                    block_hard: 1000,
                    ..QuotaLimits::default()
                },
            )
            .unwrap();
        control.remove(EntityKind::User, 7, DEV).unwrap();
        let dquot = control.get(EntityKind::User, 7, DEV).unwrap();
        assert!(dquot.limits.is_unlimited());
        assert_eq!(dquot.block_used, 500);
    }

    #[test]
    fn ids_are_scoped_by_device_and_kind() {
        let control = MemoryQuotaControl::new();
        control.set_usage(EntityKind::User, 3, DEV, 1, 1);
        control.set_usage(EntityKind::User, 1, DEV, 1, 1);
        control.set_usage(EntityKind::Group, 2, DEV, 1, 1);
        control.set_usage(EntityKind::User, 9, "/dev/sdc1", 1, 1);
        assert_eq!(control.ids(EntityKind::User, DEV).unwrap(), vec![1, 3]);
    }

    #[test]
    fn invalid_limits_are_rejected() {
        let control = MemoryQuotaControl::new();
        let err = control
            .set(
                EntityKind::User,
                1,
                DEV,
                &QuotaLimits {
                    block_soft: 10,
                    block_hard: 5,
                    ..QuotaLimits::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, ControlError::InvalidLimits(_)));
    }

    #[test]
    fn disabled_accounting_fails_every_call() {
        let control = MemoryQuotaControl::new();
        control.disable_accounting(EntityKind::Project, DEV);
        assert!(matches!(
            control.ids(EntityKind::Project, DEV),
            Err(ControlError::NotEnabled { .. })
        ));
        assert!(control.ids(EntityKind::User, DEV).is_ok());
    }
}
