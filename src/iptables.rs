mod exists;
pub mod lock;
pub mod runner;
pub mod version;

use crate::error::{Error, Result};
use crate::iptables::lock::{XtablesLock, DEFAULT_LOCK_FILE_PATH};
use crate::iptables::runner::{CommandRunner, Serialization};
use crate::iptables::version::{Capabilities, Version};
use crate::protocol::Protocol;
use std::ffi::OsStr;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Exit code of `-N` when the chain already exists
const CHAIN_EXISTS: i32 = 1;

#[derive(Debug, Clone)]
pub struct IpTablesOptions {
    pub protocol: Protocol,

    /// Tool binary; looked up in `PATH` if not set
    pub path: Option<PathBuf>,

    /// Used only if the tool lacks `--wait`
    pub lock_file: PathBuf,
}

/// Handle to `iptables` or `ip6tables`.
///
/// The tool's capabilities are probed once on construction and never change afterwards.
#[derive(Debug, Clone)]
pub struct IpTables {
    protocol: Protocol,
    version: Version,
    capabilities: Capabilities,
    runner: CommandRunner,
}

impl IpTablesOptions {
    pub fn new(protocol: Protocol) -> Self {
        Self {
            protocol,
            path: None,
            lock_file: PathBuf::from(DEFAULT_LOCK_FILE_PATH),
        }
    }
}

impl IpTables {
    pub fn new(protocol: Protocol) -> Result<Self> {
        Self::with_options(IpTablesOptions::new(protocol))
    }

    pub fn with_options(options: IpTablesOptions) -> Result<Self> {
        let path = match options.path {
            Some(path) => path,
            None => find_executable(options.protocol.command_name())?,
        };

        let version = version::probe(&path)?;
        let capabilities = Capabilities::of(version);

        log::info!(
            "Using {} {} for {} (check: {}, wait: {})",
            path.display(),
            version,
            options.protocol,
            capabilities.check,
            capabilities.wait
        );

        let serialization = if capabilities.wait {
            Serialization::NativeWait
        } else {
            Serialization::LockFile(XtablesLock::new(options.lock_file))
        };

        Ok(Self {
            protocol: options.protocol,
            version,
            capabilities,
            runner: CommandRunner::new(path, serialization),
        })
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn path(&self) -> &Path {
        self.runner.path()
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn has_check(&self) -> bool {
        self.capabilities.check
    }

    pub fn has_wait(&self) -> bool {
        self.capabilities.wait
    }

    /// For invocations not covered by the methods below
    pub fn runner(&self) -> &CommandRunner {
        &self.runner
    }

    /// Checks whether `rulespec` exists in `table`/`chain`.
    ///
    /// Tools older than 1.4.11 have no `-C`; for those, the table listing is
    /// searched instead, which also matches rules that merely begin with `rulespec`.
    pub fn exists(&self, table: &str, chain: &str, rulespec: &[&str]) -> Result<bool> {
        if self.capabilities.check {
            exists::check(&self.runner, table, chain, rulespec)
        } else {
            exists::search_listing(&self.runner, table, chain, rulespec)
        }
    }

    /// Inserts `rulespec` at `position` (1-based)
    pub fn insert(
        &self,
        table: &str,
        chain: &str,
        position: u32,
        rulespec: &[&str],
    ) -> Result<()> {
        let position = position.to_string();
        self.run_rule_command(table, "-I", chain, &[position.as_str()], rulespec)
    }

    pub fn append(&self, table: &str, chain: &str, rulespec: &[&str]) -> Result<()> {
        self.run_rule_command(table, "-A", chain, &[], rulespec)
    }

    /// Like [`Self::append`], but does nothing if the rule already exists
    pub fn append_unique(&self, table: &str, chain: &str, rulespec: &[&str]) -> Result<()> {
        if self.exists(table, chain, rulespec)? {
            return Ok(());
        }

        self.append(table, chain, rulespec)
    }

    pub fn delete(&self, table: &str, chain: &str, rulespec: &[&str]) -> Result<()> {
        self.run_rule_command(table, "-D", chain, &[], rulespec)
    }

    /// Rules of `table`/`chain` in `-S` format, including the chain definition line
    pub fn list(&self, table: &str, chain: &str) -> Result<Vec<String>> {
        self.list_lines(&["-t", table, "-S", chain])
    }

    /// Like [`Self::list`], but always passes `--wait`, even to a tool whose
    /// version predates it
    pub fn list_with_wait(&self, table: &str, chain: &str) -> Result<Vec<String>> {
        match self.runner.serialization() {
            // Appended by the runner already
            Serialization::NativeWait => self.list(table, chain),
            Serialization::LockFile(_) => self.list_lines(&["-t", table, "-S", chain, "--wait"]),
        }
    }

    /// Names of the built-in (`-P`) and user-defined (`-N`) chains of `table`
    pub fn list_chains(&self, table: &str) -> Result<Vec<String>> {
        let lines = self.list_lines(&["-t", table, "-S"])?;

        // Chain definitions always come before rules
        Ok(lines
            .iter()
            .take_while(|line| line.starts_with("-P") || line.starts_with("-N"))
            .filter_map(|line| line.split_whitespace().nth(1))
            .map(str::to_string)
            .collect())
    }

    /// Fails if the chain already exists
    pub fn new_chain(&self, table: &str, chain: &str) -> Result<()> {
        self.runner.run(&["-t", table, "-N", chain])
    }

    /// Flushes `chain`, creating it first if it does not exist
    pub fn clear_chain(&self, table: &str, chain: &str) -> Result<()> {
        match self.new_chain(table, chain) {
            Ok(()) => Ok(()),
            Err(e) if e.exit_code() == Some(CHAIN_EXISTS) => {
                self.runner.run(&["-t", table, "-F", chain])
            }
            Err(e) => Err(e),
        }
    }

    pub fn rename_chain(&self, table: &str, old_chain: &str, new_chain: &str) -> Result<()> {
        self.runner.run(&["-t", table, "-E", old_chain, new_chain])
    }

    /// The chain must be empty and unreferenced
    pub fn delete_chain(&self, table: &str, chain: &str) -> Result<()> {
        self.runner.run(&["-t", table, "-X", chain])
    }

    fn run_rule_command(
        &self,
        table: &str,
        command: &str,
        chain: &str,
        command_args: &[&str],
        rulespec: &[&str],
    ) -> Result<()> {
        let mut args = vec!["-t", table, command, chain];
        args.extend_from_slice(command_args);
        args.extend_from_slice(rulespec);
        self.runner.run(&args)
    }

    fn list_lines(&self, args: &[&str]) -> Result<Vec<String>> {
        let output = self.runner.run_with_output(args)?;
        Ok(output.lines().map(str::to_string).collect())
    }
}

fn find_executable(command: &'static str) -> Result<PathBuf> {
    let search_path = std::env::var_os("PATH").unwrap_or_default();
    find_executable_in(command, &search_path)
}

/// First executable regular file named `command` in the `PATH`-style list `search_path`
fn find_executable_in(command: &'static str, search_path: &OsStr) -> Result<PathBuf> {
    std::env::split_paths(search_path)
        .map(|dir| dir.join(command))
        .find(|candidate| is_executable(candidate))
        .ok_or(Error::NotFound { command })
}

fn is_executable(path: &Path) -> bool {
    path.metadata()
        .map(|metadata| metadata.is_file() && metadata.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}
