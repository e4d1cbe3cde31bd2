//! Single-instance lock file

use crate::error::{ModswitchError, Result};
use rustix::fs::{flock, FlockOperation};
use rustix::io::Errno;
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

/// Default lock file location
pub const DEFAULT_LOCK_FILE: &str = "/var/run/modswitch.lock";

/// Advisory exclusive lock held for the lifetime of the publisher
///
/// The lock is taken with `flock`, so it belongs to the open file
/// description and survives `fork` into a daemon child.
#[derive(Debug)]
pub struct InstanceLock {
    file: File,
    path: PathBuf,
}

impl InstanceLock {
    /// Open (creating if needed) and lock `path` without blocking
    pub fn acquire(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .mode(0o644)
            .open(path)
            .map_err(|source| ModswitchError::LockOpen {
                path: path.to_path_buf(),
                source,
            })?;

        flock(&file, FlockOperation::NonBlockingLockExclusive).map_err(|e| {
            if e == Errno::WOULDBLOCK {
                ModswitchError::AlreadyRunning {
                    path: path.to_path_buf(),
                }
            } else {
                ModswitchError::Lock {
                    path: path.to_path_buf(),
                    source: e.into(),
                }
            }
        })?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Replace the file contents with the current pid
    pub fn record_pid(&mut self) -> Result<()> {
        let pid = std::process::id();
        self.file
            .set_len(0)
            .and_then(|_| self.file.seek(SeekFrom::Start(0)))
            .and_then(|_| writeln!(self.file, "{pid}"))
            .and_then(|_| self.file.flush())
            .map_err(|source| ModswitchError::Lock {
                path: self.path.clone(),
                source,
            })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let _ = flock(&self.file, FlockOperation::Unlock);
    }
}
