use std::io;
use std::num::ParseIntError;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("'{command}' not found in PATH")]
    NotFound { command: &'static str },

    #[error("Failed to start {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        source: io::Error,
    },

    /// The tool ran, but terminated with a non-zero status or by a signal
    #[error("{status}: {}", stderr.trim_end())]
    Exit { status: ExitStatus, stderr: String },

    #[error("Lock file '{}' is held by another process", path.display())]
    LockContended { path: PathBuf },

    #[error("Failed to open lock file '{}': {source}", path.display())]
    LockFile { path: PathBuf, source: io::Error },

    #[error("Failed to lock '{}': {source}", path.display())]
    Lock {
        path: PathBuf,
        source: nix::errno::Errno,
    },

    #[error("No iptables version found in string: {0}")]
    VersionNotFound(String),

    #[error("Invalid iptables version component '{component}': {source}")]
    InvalidVersion {
        component: String,
        source: ParseIntError,
    },
}

impl Error {
    pub(crate) fn exit(status: ExitStatus, stderr: &[u8]) -> Self {
        debug_assert!(!status.success());
        Self::Exit {
            status,
            stderr: String::from_utf8_lossy(stderr).into_owned(),
        }
    }

    /// Exit code of a tool that ran and failed; `None` for every other error
    /// and for processes killed by a signal.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Exit { status, .. } => status.code(),
            _ => None,
        }
    }
}
