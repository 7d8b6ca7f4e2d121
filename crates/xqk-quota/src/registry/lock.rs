//! Cross-process registry lock: `flock(2)` on a lock file that is never removed.
//!
//! The kernel releases the lock when the holding descriptor closes, including
//! when the holder dies. Every acquisition opens its own descriptor, so
//! threads of one process wait on each other like separate processes.
#![allow(unsafe_code)]

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, Write};
use std::os::fd::AsRawFd;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::RegistryError;

const LOCK_RETRY_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub(crate) struct RegistryLock {
    file: File,
}

impl Drop for RegistryLock {
    fn drop(&mut self) {
        // SAFETY: the descriptor is owned by `self.file` and still open.
        unsafe { libc::flock(self.file.as_raw_fd(), libc::LOCK_UN) };
    }
}

pub(crate) fn acquire(lock_path: &Path, timeout: Duration) -> Result<RegistryLock, RegistryError> {
    let mut file = open(lock_path).map_err(RegistryError::io(lock_path))?;
    let started = Instant::now();

    while !try_lock(&file).map_err(RegistryError::io(lock_path))? {
        if started.elapsed() >= timeout {
            return Err(RegistryError::LockTimeout {
                path: lock_path.to_path_buf(),
                holder: holder(&mut file),
            });
        }
        thread::sleep(LOCK_RETRY_DELAY);
    }

    if let Err(err) = record_pid(&mut file) {
        debug!(lock = %lock_path.display(), error = %err, "could not record lock holder");
    }
    debug!(lock = %lock_path.display(), "registry lock acquired");
    Ok(RegistryLock { file })
}

fn open(lock_path: &Path) -> io::Result<File> {
    if let Some(parent) = lock_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path)
}

/// `Ok(false)` while another descriptor holds the lock.
fn try_lock(file: &File) -> io::Result<bool> {
    // SAFETY: the descriptor is owned by `file` and still open.
    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if rc == 0 {
        return Ok(true);
    }
    let err = io::Error::last_os_error();
    match err.raw_os_error() {
        Some(libc::EWOULDBLOCK | libc::EINTR) => Ok(false),
        _ => Err(err),
    }
}

fn record_pid(file: &mut File) -> io::Result<()> {
    file.set_len(0)?;
    file.rewind()?;
    writeln!(file, "{}", std::process::id())?;
    file.flush()
}

/// The pid the current holder wrote, if any. Informational only.
fn holder(file: &mut File) -> String {
    let mut content = String::new();
    let read = file.rewind().and_then(|()| file.read_to_string(&mut content));
    match read.ok().and_then(|_| content.trim().parse::<u32>().ok()) {
        Some(pid) => format!("held by pid {pid}"),
        None => "holder unknown".to_string(),
    }
}
