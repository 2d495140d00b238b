mod program_config;

use crate::program_config::{Command, ProgramConfig, RuleArgs, ToolConfig};
use anyhow::Context;
use env_logger::Env;
use iptables_ctl::{IpTables, IpTablesOptions, Protocol};
use std::process::ExitCode;

/// Exit code for errors; 1 is reserved for `exists` reporting an absent rule
const ERROR_EXIT_CODE: u8 = 2;

fn main() -> ExitCode {
    // Parse options
    let config = ProgramConfig::parse();

    // Set up logging
    env_logger::Builder::from_env(Env::default().default_filter_or(if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }))
    .format_timestamp(None)
    .format_module_path(false)
    .init();

    match run(config) {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("Error: {:?}", e);
            ExitCode::from(ERROR_EXIT_CODE)
        }
    }
}

fn run(config: ProgramConfig) -> anyhow::Result<ExitCode> {
    let iptables = open(config.tool)?;
    let table = config.table.as_str();

    match config.command {
        Command::Capabilities => {
            let capabilities = iptables.capabilities();
            println!("{} {}", iptables.path().display(), iptables.version());
            println!("check {}", capabilities.check);
            println!("wait {}", capabilities.wait);
        }
        Command::Exists(args) => {
            let exists = iptables
                .exists(table, &args.chain, &args.rulespec())
                .with_context(|| format!("Failed to check rule in chain '{}'", args.chain))?;
            println!("{}", exists);
            if !exists {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Append(args) => iptables
            .append(table, &args.chain, &args.rulespec())
            .with_context(|| format!("Failed to append rule to chain '{}'", args.chain))?,
        Command::AppendUnique(args) => iptables
            .append_unique(table, &args.chain, &args.rulespec())
            .with_context(|| format!("Failed to append rule to chain '{}'", args.chain))?,
        Command::Insert {
            chain,
            position,
            rule,
        } => iptables
            .insert(table, &chain, position, &as_strs(&rule))
            .with_context(|| format!("Failed to insert rule into chain '{}'", chain))?,
        Command::Delete(args) => iptables
            .delete(table, &args.chain, &args.rulespec())
            .with_context(|| format!("Failed to delete rule from chain '{}'", args.chain))?,
        Command::List { chain, wait } => {
            let rules = if wait {
                iptables.list_with_wait(table, &chain)
            } else {
                iptables.list(table, &chain)
            }
            .with_context(|| format!("Failed to list chain '{}'", chain))?;

            for rule in rules {
                println!("{}", rule);
            }
        }
        Command::ListChains => {
            let chains = iptables
                .list_chains(table)
                .with_context(|| format!("Failed to list chains of table '{}'", table))?;

            for chain in chains {
                println!("{}", chain);
            }
        }
        Command::NewChain { chain } => iptables
            .new_chain(table, &chain)
            .with_context(|| format!("Failed to create chain '{}'", chain))?,
        Command::ClearChain { chain } => iptables
            .clear_chain(table, &chain)
            .with_context(|| format!("Failed to clear chain '{}'", chain))?,
        Command::RenameChain {
            old_chain,
            new_chain,
        } => iptables
            .rename_chain(table, &old_chain, &new_chain)
            .with_context(|| format!("Failed to rename chain '{}'", old_chain))?,
        Command::DeleteChain { chain } => iptables
            .delete_chain(table, &chain)
            .with_context(|| format!("Failed to delete chain '{}'", chain))?,
    }

    Ok(ExitCode::SUCCESS)
}

fn open(config: ToolConfig) -> anyhow::Result<IpTables> {
    let protocol = Protocol::from(config.protocol);

    IpTables::with_options(IpTablesOptions {
        protocol,
        path: config.iptables_path,
        lock_file: config.lock_file,
    })
    .with_context(|| format!("Failed to initialize {}", protocol.command_name()))
}

fn as_strs(tokens: &[String]) -> Vec<&str> {
    tokens.iter().map(String::as_str).collect()
}

impl RuleArgs {
    fn rulespec(&self) -> Vec<&str> {
        as_strs(&self.rule)
    }
}
