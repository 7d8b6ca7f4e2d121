//! Filesystem statistics via `statfs(2)`.
#![allow(unsafe_code)]

use std::ffi::CString;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use crate::error::ResolveError;

pub const XFS_SUPER_MAGIC: u64 = 0x5846_5342;

/// The subset of `struct statfs` the engine reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FsStats {
    pub magic: u64,
    pub block_size: u64,
    pub blocks: u64,
    pub blocks_free: u64,
    pub blocks_available: u64,
    pub files: u64,
    pub files_free: u64,
}

impl FsStats {
    #[must_use]
    pub const fn is_xfs(&self) -> bool {
        is_xfs_magic(self.magic)
    }

    #[must_use]
    pub const fn total_bytes(&self) -> u64 {
        self.blocks.saturating_mul(self.block_size)
    }

    #[must_use]
    pub const fn used_bytes(&self) -> u64 {
        self.blocks
            .saturating_sub(self.blocks_free)
            .saturating_mul(self.block_size)
    }

    /// Bytes available to unprivileged writers.
    #[must_use]
    pub const fn free_bytes(&self) -> u64 {
        self.blocks_available.saturating_mul(self.block_size)
    }

    #[must_use]
    pub fn magic_hex(&self) -> String {
        format!("0x{:x}", self.magic)
    }
}

#[must_use]
pub const fn is_xfs_magic(magic: u64) -> bool {
    magic == XFS_SUPER_MAGIC
}

/// # Errors
///
/// Returns `ResolveError::Io` if the path cannot be stat'ed.
#[allow(clippy::unnecessary_cast, clippy::cast_sign_loss)]
pub fn statfs(path: &Path) -> Result<FsStats, ResolveError> {
    let io_err = |source| ResolveError::Io {
        action: "statfs",
        path: path.to_path_buf(),
        source,
    };
    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| io_err(io::Error::new(io::ErrorKind::InvalidInput, e)))?;

    let mut st = std::mem::MaybeUninit::<libc::statfs>::zeroed();
    // SAFETY: c_path is NUL-terminated and st points to writable storage
    // sized for struct statfs.
    let rc = unsafe { libc::statfs(c_path.as_ptr(), st.as_mut_ptr()) };
    if rc != 0 {
        return Err(io_err(io::Error::last_os_error()));
    }
    // SAFETY: statfs returned 0, so the struct is initialized.
    let st = unsafe { st.assume_init() };

    Ok(FsStats {
        // Filesystem magics are 32-bit; mask off sign extension on 32-bit targets.
        magic: (st.f_type as u64) & 0xffff_ffff,
        block_size: st.f_bsize as u64,
        blocks: st.f_blocks as u64,
        blocks_free: st.f_bfree as u64,
        blocks_available: st.f_bavail as u64,
        files: st.f_files as u64,
        files_free: st.f_ffree as u64,
    })
}

/// # Errors
///
/// Returns `ResolveError::Io` if the path cannot be stat'ed.
pub fn is_xfs(path: &Path) -> Result<bool, ResolveError> {
    Ok(statfs(path)?.is_xfs())
}
