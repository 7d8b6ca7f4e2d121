//! Mount table parsing and path-to-device resolution.
//!
//! The table is re-read on every lookup so mounts that change while the
//! process runs are seen. The source defaults to `/proc/self/mounts` and can
//! point at any file in the same format.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ResolveError;

pub const DEFAULT_MOUNTS_FILE: &str = "/proc/self/mounts";

/// One line of the mount table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub device: String,
    pub mount_point: PathBuf,
    pub fs_type: String,
    pub options: Vec<String>,
}

impl MountEntry {
    #[must_use]
    pub fn is_xfs(&self) -> bool {
        self.fs_type == "xfs"
    }
}

/// A canonical path and the mount that contains it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub path: PathBuf,
    pub mount: MountEntry,
}

#[derive(Debug, Clone)]
pub struct MountTable {
    source: PathBuf,
}

impl Default for MountTable {
    fn default() -> Self {
        Self::new(DEFAULT_MOUNTS_FILE)
    }
}

impl MountTable {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
        }
    }

    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Read and parse the current mount table.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::Io` if the table cannot be read.
    pub fn entries(&self) -> Result<Vec<MountEntry>, ResolveError> {
        let content =
            std::fs::read_to_string(&self.source).map_err(|source| ResolveError::Io {
                action: "read mount table",
                path: self.source.clone(),
                source,
            })?;
        Ok(parse_mounts(&content))
    }

    /// Canonicalize `path` and find the mount with the longest mount point
    /// that is a component-wise prefix of it.
    ///
    /// # Errors
    ///
    /// `ResolveError::NotMounted` when no entry covers the path, or
    /// `ResolveError::Io` when the path or the table cannot be read.
    pub fn resolve(&self, path: &Path) -> Result<Resolved, ResolveError> {
        let path = canonicalize(path)?;
        let entries = self.entries()?;
        let mount = longest_match(&entries, &path)
            .cloned()
            .ok_or_else(|| ResolveError::NotMounted(path.clone()))?;
        debug!(path = %path.display(), device = %mount.device, mount_point = %mount.mount_point.display(), "resolved device");
        Ok(Resolved { path, mount })
    }
}

/// Parse mount-table text. Lines with fewer than four fields are skipped.
#[must_use]
pub fn parse_mounts(content: &str) -> Vec<MountEntry> {
    content
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let device = fields.next()?;
            let mount_point = fields.next()?;
            let fs_type = fields.next()?;
            let options = fields.next()?;
            Some(MountEntry {
                device: unescape(device),
                mount_point: PathBuf::from(unescape(mount_point)),
                fs_type: fs_type.to_string(),
                options: options.split(',').map(str::to_string).collect(),
            })
        })
        .collect()
}

/// Decode the `\ooo` octal escapes the kernel uses for space, tab, newline
/// and backslash.
fn unescape(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() && is_octal_escape(&bytes[i + 1..i + 4]) {
            let value = bytes[i + 1..i + 4]
                .iter()
                .fold(0u32, |acc, b| acc * 8 + u32::from(b - b'0'));
            if let Ok(byte) = u8::try_from(value) {
                out.push(byte);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn is_octal_escape(digits: &[u8]) -> bool {
    digits.len() == 3 && digits.iter().all(|b| (b'0'..=b'7').contains(b))
}

/// Canonical absolute form of `path`. Paths that cannot be canonicalized
/// (e.g. not yet created) fall back to a lexically absolute form.
///
/// # Errors
///
/// Returns `ResolveError::Io` if neither form can be computed.
pub fn canonicalize(path: &Path) -> Result<PathBuf, ResolveError> {
    match std::fs::canonicalize(path) {
        Ok(canonical) => Ok(canonical),
        Err(err) => {
            debug!(path = %path.display(), error = %err, "canonicalize failed; using absolute path");
            std::path::absolute(path).map_err(|source| ResolveError::Io {
                action: "resolve",
                path: path.to_path_buf(),
                source,
            })
        }
    }
}

fn longest_match<'a>(entries: &'a [MountEntry], path: &Path) -> Option<&'a MountEntry> {
    let mut best: Option<&MountEntry> = None;
    for entry in entries.iter().filter(|e| path.starts_with(&e.mount_point)) {
        // Later entries shadow earlier ones mounted at the same point.
        if best.is_none_or(|b| {
            entry.mount_point.components().count() >= b.mount_point.components().count()
        }) {
            best = Some(entry);
        }
    }
    best
}
