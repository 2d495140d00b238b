use clap::{Args, Parser, Subcommand, ValueEnum};
use iptables_ctl::{Protocol, DEFAULT_LOCK_FILE_PATH};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[clap(name = "iptables-ctl")]
pub struct ProgramConfig {
    #[clap(flatten)]
    pub tool: ToolConfig,

    /// Table to operate on
    #[clap(long, env = "IPTABLES_TABLE", default_value = "filter", global = true)]
    pub table: String,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct ToolConfig {
    /// Protocol family; selects iptables or ip6tables
    #[clap(
        long,
        env = "IPTABLES_PROTOCOL",
        value_enum,
        ignore_case = true,
        default_value = "ipv4",
        global = true
    )]
    pub protocol: ProtocolKind,

    /// Path to the iptables/ip6tables binary (looked up in PATH by default)
    #[clap(long, env = "IPTABLES_PATH", global = true)]
    pub iptables_path: Option<PathBuf>,

    /// Lock file used if the tool does not support --wait
    #[clap(long, env = "XTABLES_LOCK_FILE", default_value = DEFAULT_LOCK_FILE_PATH, global = true)]
    pub lock_file: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
#[allow(non_camel_case_types)]
pub enum ProtocolKind {
    ipv4,
    ipv6,
}

#[derive(Debug, Args)]
pub struct RuleArgs {
    pub chain: String,

    /// Rule specification, e.g. `-p tcp --dport 22 -j ACCEPT`
    #[clap(required = true, allow_hyphen_values = true, trailing_var_arg = true)]
    pub rule: Vec<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the tool version and which optional features it supports
    Capabilities,

    /// Print whether a rule exists; exits with status 1 if it does not
    Exists(RuleArgs),

    /// Append a rule to a chain
    Append(RuleArgs),

    /// Append a rule to a chain unless it already exists
    AppendUnique(RuleArgs),

    /// Insert a rule into a chain at the given position (1-based)
    Insert {
        chain: String,

        position: u32,

        #[clap(required = true, allow_hyphen_values = true, trailing_var_arg = true)]
        rule: Vec<String>,
    },

    /// Delete a rule from a chain
    Delete(RuleArgs),

    /// Print the rules of a chain
    List {
        chain: String,

        /// Always pass --wait to the tool
        #[clap(long)]
        wait: bool,
    },

    /// Print the names of all chains in the table
    ListChains,

    /// Create a chain
    NewChain { chain: String },

    /// Flush a chain, creating it if necessary
    ClearChain { chain: String },

    /// Rename a chain
    RenameChain { old_chain: String, new_chain: String },

    /// Delete an empty chain
    DeleteChain { chain: String },
}

impl From<ProtocolKind> for Protocol {
    fn from(kind: ProtocolKind) -> Self {
        match kind {
            ProtocolKind::ipv4 => Protocol::IPv4,
            ProtocolKind::ipv6 => Protocol::IPv6,
        }
    }
}

impl ProgramConfig {
    pub fn parse() -> Self {
        Parser::parse()
    }
}
