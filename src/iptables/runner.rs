use crate::error::{Error, Result};
use crate::iptables::lock::XtablesLock;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

const WAIT_FLAG: &str = "--wait";

/// How concurrent invocations of the tool are kept from racing on the ruleset
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Serialization {
    /// The tool waits for the xtables lock itself when passed `--wait`
    NativeWait,

    /// The tool cannot wait; we take the xtables lock around each invocation
    LockFile(XtablesLock),
}

/// Every invocation of the tool goes through here
#[derive(Debug, Clone)]
pub struct CommandRunner {
    path: PathBuf,
    serialization: Serialization,
}

impl CommandRunner {
    pub fn new(path: PathBuf, serialization: Serialization) -> Self {
        Self {
            path,
            serialization,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn serialization(&self) -> &Serialization {
        &self.serialization
    }

    /// Runs the tool with `args`, discarding its standard output
    pub fn run(&self, args: &[&str]) -> Result<()> {
        self.invoke(args, Stdio::null()).map(|_| ())
    }

    /// Runs the tool with `args` and returns its standard output
    pub fn run_with_output(&self, args: &[&str]) -> Result<String> {
        let stdout = self.invoke(args, Stdio::piped())?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }

    fn invoke(&self, args: &[&str], stdout: Stdio) -> Result<Vec<u8>> {
        let mut command = Command::new(&self.path);
        command.args(args);

        // Held until the process has exited, released on every return path
        let _guard = match &self.serialization {
            Serialization::NativeWait => {
                command.arg(WAIT_FLAG);
                None
            }
            Serialization::LockFile(lock) => Some(lock.try_acquire()?),
        };

        log::debug!("Running {:?}", command);

        let output = command
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| Error::Spawn {
                program: self.path.clone(),
                source,
            })?;

        if output.status.success() {
            Ok(output.stdout)
        } else {
            log::debug!(
                "'{} {}' failed: [{}] {}",
                self.path.display(),
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim_end()
            );
            Err(Error::exit(output.status, &output.stderr))
        }
    }
}
