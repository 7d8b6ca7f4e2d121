//! The project registry: `projects` (name -> directory) joined with
//! `projid` (name -> id).
//!
//! Every mutation holds the registry lock for its whole read-modify-write
//! cycle and replaces each file atomically. Reads start without the lock; a
//! reader that lands between the two file replacements of one mutation sees
//! the files disagree, so it rereads once under the lock before reporting
//! corruption.
//!
//! Ids are never reused: the next id is the largest of the configured first
//! id, one past the highest id in use, and the watermark stored in `projid`.

mod codec;
mod lock;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};
use xqk_core::entities::ProjectEntry;

use crate::error::{ControlError, RegistryError};
use codec::RegistryFile;

pub const DEFAULT_FIRST_PROJECT_ID: u32 = 1000;
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ProjectRegistry {
    projects_file: PathBuf,
    projid_file: PathBuf,
    first_id: u32,
    auto_create: bool,
    lock_timeout: Duration,
}

struct Snapshot {
    projects: RegistryFile,
    projid: RegistryFile,
    entries: Vec<ProjectEntry>,
}

impl ProjectRegistry {
    pub fn new(projects_file: impl Into<PathBuf>, projid_file: impl Into<PathBuf>) -> Self {
        Self {
            projects_file: projects_file.into(),
            projid_file: projid_file.into(),
            first_id: DEFAULT_FIRST_PROJECT_ID,
            auto_create: true,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_first_id(mut self, first_id: u32) -> Self {
        self.first_id = first_id;
        self
    }

    #[must_use]
    pub const fn with_auto_create(mut self, auto_create: bool) -> Self {
        self.auto_create = auto_create;
        self
    }

    #[must_use]
    pub const fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    #[must_use]
    pub fn projects_file(&self) -> &Path {
        &self.projects_file
    }

    #[must_use]
    pub fn projid_file(&self) -> &Path {
        &self.projid_file
    }

    /// `<projid_file>.lock`.
    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        let mut name = self.projid_file.clone().into_os_string();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// All registered projects, ordered by id.
    ///
    /// # Errors
    ///
    /// `RegistryError::Corrupt` if the files disagree or a line is malformed.
    pub fn list(&self) -> Result<Vec<ProjectEntry>, RegistryError> {
        match self.load() {
            Err(RegistryError::Corrupt { file, reason }) => self.reload_locked(file, reason),
            loaded => Ok(loaded?.entries),
        }
    }

    /// # Errors
    ///
    /// `RegistryError::NotFound` if no project has this name.
    pub fn lookup(&self, name: &str) -> Result<ProjectEntry, RegistryError> {
        self.list()?
            .into_iter()
            .find(|entry| entry.name == name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// Register a project: allocate the next id, tag `path` with it through
    /// `assign`, then append to `projid` and `projects` in that order.
    ///
    /// Nothing is written if `assign` fails.
    ///
    /// # Errors
    ///
    /// `AlreadyExists`, `InvalidName`, `Assign`, lock, I/O and corruption
    /// failures.
    pub fn create<F>(&self, name: &str, path: &Path, assign: F) -> Result<ProjectEntry, RegistryError>
    where
        F: FnOnce(&Path, u32) -> Result<(), ControlError>,
    {
        validate_name(name)?;
        let dir = std::path::absolute(path).map_err(RegistryError::io(path))?;
        if dir.as_os_str().to_string_lossy().contains('\n') {
            return Err(RegistryError::InvalidName {
                name: dir.display().to_string(),
                reason: "directory paths cannot contain newlines",
            });
        }

        let _lock = lock::acquire(&self.lock_path(), self.lock_timeout)?;
        let mut snapshot = self.load()?;
        if snapshot.entries.iter().any(|entry| entry.name == name) {
            return Err(RegistryError::AlreadyExists(name.to_string()));
        }

        self.ensure_dir(&dir)?;
        let id = self.next_id(&snapshot)?;
        assign(&dir, id).map_err(|source| RegistryError::Assign {
            id,
            dir: dir.clone(),
            source,
        })?;

        snapshot.projid.push_entry(name, &id.to_string());
        snapshot.projid.set_watermark(id.saturating_add(1));
        snapshot.projid.write_atomic(&self.projid_file)?;

        snapshot
            .projects
            .push_entry(name, &dir.to_string_lossy());
        snapshot.projects.write_atomic(&self.projects_file)?;

        info!(name, id, dir = %dir.display(), "project created");
        Ok(ProjectEntry {
            id,
            name: name.to_string(),
            path: dir,
        })
    }

    /// Unregister a project. `projects` is rewritten before `projid`; the id
    /// stays reserved through the watermark.
    ///
    /// # Errors
    ///
    /// `NotFound`, lock, I/O and corruption failures.
    pub fn remove(&self, name: &str) -> Result<ProjectEntry, RegistryError> {
        let _lock = lock::acquire(&self.lock_path(), self.lock_timeout)?;
        let mut snapshot = self.load()?;
        let entry = snapshot
            .entries
            .iter()
            .find(|entry| entry.name == name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        let next = self.next_id(&snapshot)?;

        // A numeric `projects` key belongs to this id only when no project is
        // literally named after it.
        let id_key = entry.id.to_string();
        if snapshot.entries.iter().any(|other| other.name == id_key) {
            snapshot.projects.remove_keys(&[name]);
        } else {
            snapshot.projects.remove_keys(&[name, id_key.as_str()]);
        }
        snapshot.projects.write_atomic(&self.projects_file)?;

        snapshot.projid.remove_keys(&[name]);
        snapshot.projid.set_watermark(next);
        snapshot.projid.write_atomic(&self.projid_file)?;

        info!(name, id = entry.id, "project removed");
        Ok(entry)
    }

    fn ensure_dir(&self, dir: &Path) -> Result<(), RegistryError> {
        if dir.is_dir() {
            return Ok(());
        }
        if dir.exists() || !self.auto_create {
            return Err(RegistryError::Io {
                path: dir.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "project path is not an existing directory",
                ),
            });
        }
        std::fs::create_dir_all(dir).map_err(RegistryError::io(dir))?;
        debug!(dir = %dir.display(), "created project directory");
        Ok(())
    }

    fn next_id(&self, snapshot: &Snapshot) -> Result<u32, RegistryError> {
        let past_max = match snapshot.entries.iter().map(|e| e.id).max() {
            Some(max) => max.checked_add(1).ok_or_else(|| RegistryError::Corrupt {
                file: self.projid_file.clone(),
                reason: "project id space exhausted".into(),
            })?,
            None => 0,
        };
        let watermark = snapshot.projid.watermark().unwrap_or(0);
        Ok(self.first_id.max(past_max).max(watermark))
    }

    fn reload_locked(
        &self,
        file: PathBuf,
        reason: String,
    ) -> Result<Vec<ProjectEntry>, RegistryError> {
        debug!(file = %file.display(), %reason, "registry mismatch, rereading under lock");
        let _lock = match lock::acquire(&self.lock_path(), self.lock_timeout) {
            Ok(lock) => lock,
            // Readers without write access to the lock file keep the first verdict.
            Err(RegistryError::Io { .. }) => return Err(RegistryError::Corrupt { file, reason }),
            Err(err) => return Err(err),
        };
        Ok(self.load()?.entries)
    }

    fn load(&self) -> Result<Snapshot, RegistryError> {
        let projects = RegistryFile::read(&self.projects_file)?;
        let projid = RegistryFile::read(&self.projid_file)?;
        let entries = self.join(&projects, &projid)?;
        Ok(Snapshot {
            projects,
            projid,
            entries,
        })
    }

    fn join(
        &self,
        projects: &RegistryFile,
        projid: &RegistryFile,
    ) -> Result<Vec<ProjectEntry>, RegistryError> {
        let corrupt = |file: &Path, reason: String| RegistryError::Corrupt {
            file: file.to_path_buf(),
            reason,
        };

        let mut ids: BTreeMap<&str, u32> = BTreeMap::new();
        let mut names_by_id: BTreeMap<u32, &str> = BTreeMap::new();
        for (name, value) in projid.entries() {
            let id: u32 = value.parse().map_err(|_| {
                corrupt(&self.projid_file, format!("project '{name}' has non-numeric id '{value}'"))
            })?;
            if ids.insert(name, id).is_some() {
                return Err(corrupt(&self.projid_file, format!("duplicate project '{name}'")));
            }
            if let Some(other) = names_by_id.insert(id, name) {
                return Err(corrupt(
                    &self.projid_file,
                    format!("id {id} is shared by '{other}' and '{name}'"),
                ));
            }
        }

        let mut paths: BTreeMap<&str, &str> = BTreeMap::new();
        for (key, dir) in projects.entries() {
            // `projects` may key a directory by numeric id instead of name.
            let name = match key.parse::<u32>().ok().and_then(|id| names_by_id.get(&id)) {
                Some(name) if !ids.contains_key(key) => *name,
                _ => key,
            };
            if paths.insert(name, dir).is_some() {
                return Err(corrupt(&self.projects_file, format!("duplicate project '{name}'")));
            }
        }

        if let Some(name) = paths.keys().find(|name| !ids.contains_key(*name)) {
            return Err(corrupt(&self.projid_file, format!("project '{name}' has no id")));
        }

        let mut entries = ids
            .into_iter()
            .map(|(name, id)| {
                paths
                    .get(name)
                    .map(|dir| ProjectEntry {
                        id,
                        name: name.to_string(),
                        path: PathBuf::from(dir),
                    })
                    .ok_or_else(|| {
                        corrupt(&self.projects_file, format!("project '{name}' has no directory"))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort_by_key(|entry| entry.id);
        Ok(entries)
    }
}

/// Project names are non-empty, contain no ':' or whitespace, and do not
/// start with '#'.
///
/// # Errors
///
/// `RegistryError::InvalidName` naming the violated rule.
pub fn validate_name(name: &str) -> Result<(), RegistryError> {
    let reason = if name.is_empty() {
        "name cannot be empty"
    } else if name.contains(':') {
        "name cannot contain ':'"
    } else if name.chars().any(char::is_whitespace) {
        "name cannot contain whitespace"
    } else if name.starts_with('#') {
        "name cannot start with '#'"
    } else {
        return Ok(());
    };
    Err(RegistryError::InvalidName {
        name: name.to_string(),
        reason,
    })
}
