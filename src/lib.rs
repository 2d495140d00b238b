//! Drives `iptables`/`ip6tables` safely from concurrent processes.
//!
//! An [`IpTables`] handle probes the tool's version once and then either passes
//! `--wait` on every invocation, or (for tools older than 1.4.20) holds the
//! xtables lock file around each one. Rule existence checks fall back to
//! searching the `-S` listing on tools without `-C`.

pub mod error;
pub mod iptables;
pub mod protocol;

pub use crate::error::{Error, Result};
pub use crate::iptables::lock::{XtablesLock, XtablesLockGuard, DEFAULT_LOCK_FILE_PATH};
pub use crate::iptables::runner::{CommandRunner, Serialization};
pub use crate::iptables::version::{Capabilities, Version};
pub use crate::iptables::{IpTables, IpTablesOptions};
pub use crate::protocol::Protocol;
