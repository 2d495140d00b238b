use crate::error::{Error, Result};
use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

/// Lock file shared by the iptables tools themselves (flock-based since iptables 1.4.20)
pub const DEFAULT_LOCK_FILE_PATH: &str = "/var/run/xtables.lock";

/// Cooperative cross-process lock over the kernel ruleset.
///
/// Only processes that lock the same path are serialized; anything running
/// the tools directly without `--wait` is not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XtablesLock {
    path: PathBuf,
}

/// Holds the lock until dropped
pub struct XtablesLockGuard {
    _flock: Flock<File>,
}

impl XtablesLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Takes the lock without blocking; fails with [`Error::LockContended`] if it is held.
    pub fn try_acquire(&self) -> Result<XtablesLockGuard> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .mode(0o600)
            .open(&self.path)
            .map_err(|source| Error::LockFile {
                path: self.path.clone(),
                source,
            })?;

        match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(flock) => Ok(XtablesLockGuard { _flock: flock }),
            Err((_, errno)) if errno == Errno::EWOULDBLOCK => Err(Error::LockContended {
                path: self.path.clone(),
            }),
            Err((_, errno)) => Err(Error::Lock {
                path: self.path.clone(),
                source: errno,
            }),
        }
    }
}

impl std::fmt::Debug for XtablesLockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("XtablesLockGuard")
    }
}

impl Default for XtablesLock {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_FILE_PATH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn creates_lock_file() {
        let dir = tempfile::tempdir().unwrap();
        let lock = XtablesLock::new(dir.path().join("xtables.lock"));

        let _guard = lock.try_acquire().unwrap();

        assert!(lock.path().is_file());
    }

    #[test]
    fn released_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let lock = XtablesLock::new(dir.path().join("xtables.lock"));

        drop(lock.try_acquire().unwrap());
        drop(lock.try_acquire().unwrap());
    }

    #[test]
    fn contended_while_held() {
        let dir = tempfile::tempdir().unwrap();
        let lock = XtablesLock::new(dir.path().join("xtables.lock"));
        let other = lock.clone();

        let guard = lock.try_acquire().unwrap();
        assert_matches!(
            other.try_acquire(),
            Err(Error::LockContended { path }) if path == lock.path()
        );

        drop(guard);
        assert!(other.try_acquire().is_ok());
    }

    #[test]
    fn released_when_holder_panics() {
        let dir = tempfile::tempdir().unwrap();
        let lock = XtablesLock::new(dir.path().join("xtables.lock"));

        let panicking = lock.clone();
        let result = std::panic::catch_unwind(move || {
            let _guard = panicking.try_acquire().unwrap();
            panic!("invocation failed");
        });

        assert!(result.is_err());
        assert!(lock.try_acquire().is_ok());
    }

    #[test]
    fn unopenable_lock_file() {
        let dir = tempfile::tempdir().unwrap();
        let lock = XtablesLock::new(dir.path().join("missing").join("xtables.lock"));

        assert_matches!(lock.try_acquire(), Err(Error::LockFile { .. }));
    }

    #[test]
    fn default_path() {
        assert_eq!(
            XtablesLock::default().path(),
            Path::new("/var/run/xtables.lock")
        );
    }
}
