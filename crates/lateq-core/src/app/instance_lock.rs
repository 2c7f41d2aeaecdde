//! Single-instance guard backed by an OS lock on a file.
//!
//! The kernel drops the lock when the holding process dies, however it dies,
//! so a lock file left behind by a killed instance does not block a restart.

use std::fs::{self, File, OpenOptions, TryLockError};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum InstanceLockError {
    #[error("another instance is already running (lock file {0} is held)")]
    AlreadyRunning(PathBuf),

    #[error("cannot lock {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Holds an exclusive lock on the lock file for as long as it lives.
///
/// On drop the file is removed and the lock released.
#[derive(Debug)]
pub struct InstanceLock {
    path: PathBuf,
    file: File,
}

impl InstanceLock {
    /// Open (or create) `path`, lock it exclusively and write our PID into it.
    pub fn acquire(path: impl AsRef<Path>) -> Result<Self, InstanceLockError> {
        let path = path.as_ref().to_path_buf();
        let io_err = |source| InstanceLockError::Io {
            path: path.clone(),
            source,
        };

        // no truncate here: the file may belong to a running holder
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(io_err)?;

        match file.try_lock() {
            Ok(()) => {}
            Err(TryLockError::WouldBlock) => return Err(InstanceLockError::AlreadyRunning(path)),
            Err(TryLockError::Error(e)) => return Err(io_err(e)),
        }

        file.set_len(0).map_err(io_err)?;
        file.seek(SeekFrom::Start(0)).map_err(io_err)?;
        writeln!(file, "{}", std::process::id()).map_err(io_err)?;
        file.flush().map_err(io_err)?;

        info!(path = %path.display(), "instance lock acquired");
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        // remove while still holding the lock, so no one locks a file we then delete
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove lock file");
        }
        if let Err(e) = self.file.unlock() {
            warn!(path = %self.path.display(), error = %e, "failed to release lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_holder_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lateq.lock");

        let lock = InstanceLock::acquire(&path).unwrap();
        let pid = fs::read_to_string(lock.path()).unwrap();
        assert_eq!(pid.trim(), std::process::id().to_string());

        let err = InstanceLock::acquire(&path).unwrap_err();
        assert!(matches!(err, InstanceLockError::AlreadyRunning(p) if p == path));

        // the refused attempt must not clobber the holder's PID
        let pid = fs::read_to_string(lock.path()).unwrap();
        assert_eq!(pid.trim(), std::process::id().to_string());
    }

    #[test]
    fn drop_releases_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lateq.lock");

        drop(InstanceLock::acquire(&path).unwrap());
        assert!(!path.exists());

        let _again = InstanceLock::acquire(&path).unwrap();
    }

    #[test]
    fn stale_file_from_dead_holder_is_taken_over() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lateq.lock");
        fs::write(&path, "999999999\n").unwrap();

        let lock = InstanceLock::acquire(&path).unwrap();

        let pid = fs::read_to_string(lock.path()).unwrap();
        assert_eq!(pid.trim(), std::process::id().to_string());
    }

    #[test]
    fn missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("lateq.lock");

        let err = InstanceLock::acquire(&path).unwrap_err();
        assert!(matches!(err, InstanceLockError::Io { .. }));
    }
}
