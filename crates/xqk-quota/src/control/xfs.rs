//! `quotactl(2)` and `FS_IOC_FS[GS]ETXATTR` against a live XFS filesystem.
#![allow(unsafe_code)]

use std::ffi::{CStr, CString, c_int};
use std::fs::File;
use std::io;
use std::os::fd::AsRawFd;
use std::path::Path;

use tracing::{debug, trace};
use xqk_core::entities::QuotaLimits;
use xqk_core::enums::EntityKind;

use super::{DiskQuota, QuotaControl, bb_to_kb, kb_to_bb};
use crate::error::ControlError;

const fn xqm_cmd(cmd: u32) -> u32 {
    ((b'X' as u32) << 8) + cmd
}

const Q_XGETQUOTA: u32 = xqm_cmd(3);
const Q_XSETQLIM: u32 = xqm_cmd(4);
const Q_XGETNEXTQUOTA: u32 = xqm_cmd(9);

const SUBCMDSHIFT: u32 = 8;
const SUBCMDMASK: u32 = 0xff;

#[allow(clippy::cast_possible_wrap)]
const fn qcmd(cmd: u32, kind: EntityKind) -> c_int {
    ((cmd << SUBCMDSHIFT) | (kind.kernel_type() & SUBCMDMASK)) as c_int
}

const FS_DQUOT_VERSION: i8 = 1;

const FS_DQ_ISOFT: u16 = 1 << 0;
const FS_DQ_IHARD: u16 = 1 << 1;
const FS_DQ_BSOFT: u16 = 1 << 2;
const FS_DQ_BHARD: u16 = 1 << 3;
const FS_DQ_LIMIT_MASK: u16 = FS_DQ_ISOFT | FS_DQ_IHARD | FS_DQ_BSOFT | FS_DQ_BHARD;

/// `struct fs_disk_quota` from `<linux/dqblk_xfs.h>`. Block fields are in
/// 512-byte basic blocks.
#[repr(C)]
#[derive(Debug, Default)]
struct FsDiskQuota {
    d_version: i8,
    d_flags: i8,
    d_fieldmask: u16,
    d_id: u32,
    d_blk_hardlimit: u64,
    d_blk_softlimit: u64,
    d_ino_hardlimit: u64,
    d_ino_softlimit: u64,
    d_bcount: u64,
    d_icount: u64,
    d_itimer: i32,
    d_btimer: i32,
    d_iwarns: u16,
    d_bwarns: u16,
    d_itimer_hi: i8,
    d_btimer_hi: i8,
    d_rtbtimer_hi: i8,
    d_padding2: i8,
    d_rtb_hardlimit: u64,
    d_rtb_softlimit: u64,
    d_rtbcount: u64,
    d_rtbtimer: i32,
    d_rtbwarns: u16,
    d_padding3: i16,
    d_padding4: [i8; 8],
}

impl FsDiskQuota {
    fn limits_for(kind: EntityKind, id: u32, limits: &QuotaLimits) -> Self {
        Self {
            d_version: FS_DQUOT_VERSION,
            d_flags: kind.xfs_flag(),
            d_fieldmask: FS_DQ_LIMIT_MASK,
            d_id: id,
            d_blk_hardlimit: kb_to_bb(limits.block_hard),
            d_blk_softlimit: kb_to_bb(limits.block_soft),
            d_ino_hardlimit: limits.inode_hard,
            d_ino_softlimit: limits.inode_soft,
            ..Self::default()
        }
    }

    const fn to_disk_quota(&self) -> DiskQuota {
        DiskQuota {
            id: self.d_id,
            limits: QuotaLimits {
                block_soft: bb_to_kb(self.d_blk_softlimit),
                block_hard: bb_to_kb(self.d_blk_hardlimit),
                inode_soft: self.d_ino_softlimit,
                inode_hard: self.d_ino_hardlimit,
            },
            block_used: bb_to_kb(self.d_bcount),
            inode_used: self.d_icount,
        }
    }
}

const FS_IOC_FSGETXATTR: u32 = 0x801c_581f;
const FS_IOC_FSSETXATTR: u32 = 0x401c_5820;
const FS_XFLAG_PROJINHERIT: u32 = 0x0000_0200;

/// `struct fsxattr` from `<linux/fs.h>`.
#[repr(C)]
#[derive(Debug, Default)]
struct FsXattr {
    fsx_xflags: u32,
    fsx_extsize: u32,
    fsx_nextents: u32,
    fsx_projid: u32,
    fsx_cowextsize: u32,
    fsx_pad: [u8; 8],
}

/// Quota control backed by the running kernel.
#[derive(Debug, Clone, Copy, Default)]
pub struct XfsQuotaControl;

impl XfsQuotaControl {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[allow(clippy::cast_possible_wrap)]
fn quotactl(cmd: c_int, device: &CStr, id: u32, data: &mut FsDiskQuota) -> io::Result<()> {
    // SAFETY: device is NUL-terminated and data is a live, correctly laid out
    // fs_disk_quota the kernel may read from or write into.
    let rc = unsafe {
        libc::syscall(
            libc::SYS_quotactl,
            cmd,
            device.as_ptr(),
            id as c_int,
            std::ptr::from_mut(data).cast::<libc::c_char>(),
        )
    };
    if rc == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

fn device_cstr(op: &'static str, device: &str) -> Result<CString, ControlError> {
    CString::new(device).map_err(|e| ControlError::Device {
        op,
        target: device.to_string(),
        source: io::Error::new(io::ErrorKind::InvalidInput, e),
    })
}

fn map_quotactl_error(
    err: io::Error,
    op: &'static str,
    kind: EntityKind,
    id: u32,
    device: &str,
) -> ControlError {
    match err.raw_os_error() {
        Some(libc::EPERM | libc::EACCES) => ControlError::PermissionDenied {
            op,
            target: device.to_string(),
        },
        Some(libc::ENOENT) => ControlError::NoSuchEntity {
            kind,
            id,
            device: device.to_string(),
        },
        Some(libc::ESRCH) => ControlError::NotEnabled {
            kind,
            device: device.to_string(),
        },
        _ => ControlError::Device {
            op,
            target: device.to_string(),
            source: err,
        },
    }
}

fn map_ioctl_error(err: io::Error, op: &'static str, dir: &Path) -> ControlError {
    match err.raw_os_error() {
        Some(libc::EPERM | libc::EACCES) => ControlError::PermissionDenied {
            op,
            target: dir.display().to_string(),
        },
        _ => ControlError::Device {
            op,
            target: dir.display().to_string(),
            source: err,
        },
    }
}

fn fsxattr_ioctl(file: &File, request: u32, attr: &mut FsXattr) -> io::Result<()> {
    // SAFETY: the fd is open for the lifetime of `file` and attr is a
    // correctly laid out struct fsxattr.
    let rc = unsafe {
        libc::ioctl(
            file.as_raw_fd(),
            request as _,
            std::ptr::from_mut(attr),
        )
    };
    if rc == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

impl QuotaControl for XfsQuotaControl {
    fn get(&self, kind: EntityKind, id: u32, device: &str) -> Result<DiskQuota, ControlError> {
        let dev = device_cstr("get quota", device)?;
        let mut raw = FsDiskQuota::default();
        quotactl(qcmd(Q_XGETQUOTA, kind), &dev, id, &mut raw)
            .map_err(|e| map_quotactl_error(e, "get quota", kind, id, device))?;
        trace!(%kind, id, device, "Q_XGETQUOTA");
        // Older kernels leave d_id untouched on Q_XGETQUOTA.
        Ok(DiskQuota {
            id,
            ..raw.to_disk_quota()
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
        let dev = device_cstr("set limits", device)?;
        let mut raw = FsDiskQuota::limits_for(kind, id, limits);
        quotactl(qcmd(Q_XSETQLIM, kind), &dev, id, &mut raw)
            .map_err(|e| map_quotactl_error(e, "set limits", kind, id, device))?;
        debug!(%kind, id, device, ?limits, "Q_XSETQLIM");
        Ok(())
    }

    fn ids(&self, kind: EntityKind, device: &str) -> Result<Vec<u32>, ControlError> {
        let dev = device_cstr("enumerate quotas", device)?;
        let mut ids = Vec::new();
        let mut next = 0u32;
        loop {
            let mut raw = FsDiskQuota::default();
            match quotactl(qcmd(Q_XGETNEXTQUOTA, kind), &dev, next, &mut raw) {
                Ok(()) => {
                    if raw.d_id < next {
                        break;
                    }
                    ids.push(raw.d_id);
                    match raw.d_id.checked_add(1) {
                        Some(n) => next = n,
                        None => break,
                    }
                }
                Err(e) if e.raw_os_error() == Some(libc::ENOENT) => break,
                Err(e) => return Err(map_quotactl_error(e, "enumerate quotas", kind, next, device)),
            }
        }
        debug!(%kind, device, count = ids.len(), "Q_XGETNEXTQUOTA");
        Ok(ids)
    }

    fn assign_project(&self, dir: &Path, id: u32) -> Result<(), ControlError> {
        let file = File::open(dir).map_err(|e| map_ioctl_error(e, "open directory", dir))?;
        let mut attr = FsXattr::default();
        fsxattr_ioctl(&file, FS_IOC_FSGETXATTR, &mut attr)
            .map_err(|e| map_ioctl_error(e, "read project attributes", dir))?;
        attr.fsx_projid = id;
        attr.fsx_xflags |= FS_XFLAG_PROJINHERIT;
        fsxattr_ioctl(&file, FS_IOC_FSSETXATTR, &mut attr)
            .map_err(|e| map_ioctl_error(e, "set project id", dir))?;
        debug!(dir = %dir.display(), id, "assigned project id");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::size_of;

    #[test]
    fn command_encoding() {
        assert_eq!(Q_XGETQUOTA, 0x5803);
        assert_eq!(Q_XSETQLIM, 0x5804);
        assert_eq!(Q_XGETNEXTQUOTA, 0x5809);
        assert_eq!(qcmd(Q_XGETQUOTA, EntityKind::User), 0x0058_0300);
        assert_eq!(qcmd(Q_XSETQLIM, EntityKind::Group), 0x0058_0401);
        assert_eq!(qcmd(Q_XGETNEXTQUOTA, EntityKind::Project), 0x0058_0902);
    }

    #[test]
    fn struct_layouts_match_kernel_abi() {
        assert_eq!(size_of::<FsDiskQuota>(), 112);
        assert_eq!(size_of::<FsXattr>(), 28);
    }

    #[test]
    fn limits_are_sent_in_basic_blocks() {
        let limits = QuotaLimits {
            block_soft: 1_048_576,
            block_hard: 2_097_152,
            inode_soft: 100,
            inode_hard: 200,
        };
        let raw = FsDiskQuota::limits_for(EntityKind::Project, 1000, &limits);
        assert_eq!(raw.d_version, FS_DQUOT_VERSION);
        assert_eq!(raw.d_flags, 2);
        assert_eq!(raw.d_fieldmask, 0b1111);
        assert_eq!(raw.d_blk_softlimit, 2_097_152);
        assert_eq!(raw.d_blk_hardlimit, 4_194_304);
        assert_eq!(raw.d_ino_hardlimit, 200);
        assert_eq!(raw.to_disk_quota().limits, limits);
    }

    #[test]
    fn errno_mapping() {
        let map = |errno| {
            map_quotactl_error(
                io::Error::from_raw_os_error(errno),
                "get quota",
                EntityKind::User,
                7,
                "/dev/sdb1",
            )
        };
        assert!(matches!(map(libc::EPERM), ControlError::PermissionDenied { .. }));
        assert!(matches!(map(libc::EACCES), ControlError::PermissionDenied { .. }));
        assert!(matches!(map(libc::ENOENT), ControlError::NoSuchEntity { id: 7, .. }));
        assert!(matches!(map(libc::ESRCH), ControlError::NotEnabled { .. }));
        assert!(matches!(map(libc::EIO), ControlError::Device { .. }));
    }

    #[test]
    fn device_path_with_nul_is_rejected() {
        let err = XfsQuotaControl::new()
            .get(EntityKind::User, 0, "/dev/sd\0b")
            .unwrap_err();
        assert!(matches!(err, ControlError::Device { .. }));
    }
}
