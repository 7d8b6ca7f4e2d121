//! Line codec for the `projects` and `projid` files.
//!
//! Both files hold `key:value` lines. Comments and blank lines are kept
//! verbatim so rewriting a file only touches the lines that changed. The
//! `projid` file may carry one `# xfs-quota-kit:next-id=N` comment recording
//! the lowest id never handed out.

use std::fs::{self, File, Permissions};
use std::io::{self, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::RegistryError;

const WATERMARK_PREFIX: &str = "# xfs-quota-kit:next-id=";
const DEFAULT_MODE: u32 = 0o644;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Entry { key: String, value: String },
    Watermark(u32),
    Verbatim(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct RegistryFile {
    lines: Vec<Line>,
}

impl RegistryFile {
    /// Read `path`; a missing file is an empty registry.
    pub(crate) fn read(path: &Path) -> Result<Self, RegistryError> {
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(path, &content),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(RegistryError::io(path)(err)),
        }
    }

    pub(crate) fn parse(file: &Path, content: &str) -> Result<Self, RegistryError> {
        let lines = content
            .lines()
            .enumerate()
            .map(|(idx, raw)| parse_line(file, idx + 1, raw))
            .collect::<Result<_, _>>()?;
        Ok(Self { lines })
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.lines.iter().filter_map(|line| match line {
            Line::Entry { key, value } => Some((key.as_str(), value.as_str())),
            _ => None,
        })
    }

    pub(crate) fn push_entry(&mut self, key: &str, value: &str) {
        self.lines.push(Line::Entry {
            key: key.to_string(),
            value: value.to_string(),
        });
    }

    /// Drop every entry whose key is one of `keys`. Returns how many went.
    pub(crate) fn remove_keys(&mut self, keys: &[&str]) -> usize {
        let before = self.lines.len();
        self.lines
            .retain(|line| !matches!(line, Line::Entry { key, .. } if keys.contains(&key.as_str())));
        before - self.lines.len()
    }

    pub(crate) fn watermark(&self) -> Option<u32> {
        self.lines.iter().find_map(|line| match line {
            Line::Watermark(n) => Some(*n),
            _ => None,
        })
    }

    pub(crate) fn set_watermark(&mut self, next: u32) {
        if let Some(slot) = self
            .lines
            .iter_mut()
            .find(|line| matches!(line, Line::Watermark(_)))
        {
            *slot = Line::Watermark(next);
        } else {
            self.lines.insert(0, Line::Watermark(next));
        }
    }

    pub(crate) fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                Line::Entry { key, value } => {
                    out.push_str(key);
                    out.push(':');
                    out.push_str(value);
                }
                Line::Watermark(n) => {
                    out.push_str(WATERMARK_PREFIX);
                    out.push_str(&n.to_string());
                }
                Line::Verbatim(text) => out.push_str(text),
            }
            out.push('\n');
        }
        out
    }

    /// Replace `path` atomically: write a sibling temp file, fsync it,
    /// rename it over the target, then fsync the directory.
    pub(crate) fn write_atomic(&self, path: &Path) -> Result<(), RegistryError> {
        let dir = parent_dir(path);
        let mode = fs::metadata(path).map_or(DEFAULT_MODE, |m| m.permissions().mode() & 0o7777);

        let mut tmp = NamedTempFile::new_in(&dir).map_err(RegistryError::io(&dir))?;
        tmp.write_all(self.render().as_bytes())
            .and_then(|()| tmp.as_file().set_permissions(Permissions::from_mode(mode)))
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(RegistryError::io(tmp.path()))?;
        tmp.persist(path)
            .map_err(|e| RegistryError::io(path)(e.error))?;

        File::open(&dir)
            .and_then(|d| d.sync_all())
            .map_err(RegistryError::io(&dir))
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn parse_line(file: &Path, number: usize, raw: &str) -> Result<Line, RegistryError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        if let Some(next) = trimmed
            .strip_prefix(WATERMARK_PREFIX)
            .and_then(|n| n.trim().parse().ok())
        {
            return Ok(Line::Watermark(next));
        }
        return Ok(Line::Verbatim(raw.to_string()));
    }

    match trimmed.split_once(':') {
        Some((key, value)) if !key.trim().is_empty() && !value.trim().is_empty() => {
            Ok(Line::Entry {
                key: key.trim().to_string(),
                value: value.trim().to_string(),
            })
        }
        _ => Err(RegistryError::Corrupt {
            file: file.to_path_buf(),
            reason: format!("line {number}: expected 'name:value', found '{trimmed}'"),
        }),
    }
}
