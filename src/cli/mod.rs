//! CLI subcommand definitions and handlers.
//!
//! - `pagehawk scan -i <INPUT> -o <OUTPUT>` - Visit every resolved socket
//! - `pagehawk resolve -i <INPUT>` - Print the socket task list without visiting

mod resolve;
mod scan;

pub use resolve::ResolveCommand;
pub use scan::ScanCommand;

use crate::error::{CliError, CliResult};
use crate::resolve::{build_sockets, read_input, TargetResolver};
use crate::types::{Port, PortSpec, Socket};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// PageHawk - web surface reconnaissance.
///
/// Resolves IPs, CIDR ranges, URLs, domains and nmap exports into
/// `host:port` sockets, visits each one over HTTP/HTTPS and keeps the
/// results in a JSON file that survives interruption.
#[derive(Parser, Debug)]
#[command(name = "pagehawk")]
#[command(author = "HueCodes <huecodes@proton.me>")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Visit and screenshot web services across many targets", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v warn, -vv info, -vvv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to custom settings file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Visit every socket and record the responses
    #[command(alias = "s")]
    Scan(ScanCommand),

    /// Resolve targets and print the socket task list
    #[command(alias = "r")]
    Resolve(ResolveCommand),
}

/// Target and port selection shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Targets: a file (target list or nmap XML) or comma-separated input
    ///
    /// Examples:
    ///   10.0.0.1,example.com       Direct input
    ///   192.168.1.0/24             CIDR range
    ///   https://example.com/login  URL with path
    ///   10.0.0.5:8080              Explicit socket
    ///   targets.txt / scan.xml     Target list or nmap export
    #[arg(short, long, value_name = "INPUT")]
    pub input: String,

    /// Ports: presets (default, default2, default3, default_all) and/or numbers
    #[arg(short, long, value_name = "SPEC")]
    pub ports: Option<String>,
}

/// The resolved work of a run.
#[derive(Debug, Clone)]
pub struct ScanPlan {
    pub ports: Vec<Port>,
    pub sockets: Vec<Socket>,
}

impl TargetArgs {
    /// Resolve input and ports into the socket task list.
    ///
    /// Any unparseable target or port entry aborts before scanning.
    pub fn plan(&self) -> CliResult<ScanPlan> {
        let ports = PortSpec::parse_optional(self.ports.as_deref())?.to_ports();
        tracing::info!("Using {} ports", ports.len());

        let input = read_input(&self.input)?;
        if input.is_empty() {
            return Err(CliError::NothingToScan);
        }

        let resolution = TargetResolver::resolve(&input);
        if !resolution.is_complete() {
            return Err(CliError::InputValidation(resolution.failures.len()));
        }

        let sockets = build_sockets(&resolution.targets, &ports);
        if sockets.is_empty() {
            return Err(CliError::NothingToScan);
        }

        Ok(ScanPlan { ports, sockets })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(input: &str, ports: Option<&str>) -> TargetArgs {
        TargetArgs {
            input: input.to_string(),
            ports: ports.map(str::to_string),
        }
    }

    #[test]
    fn test_cli_parses_scan() {
        let cli = Cli::try_parse_from([
            "pagehawk", "-vv", "scan", "-i", "10.0.0.1", "-o", "/tmp", "--threads", "4",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Scan(cmd) => {
                assert_eq!(cmd.targets.input, "10.0.0.1");
                assert_eq!(cmd.threads, Some(4));
            }
            other => panic!("expected scan, got {:?}", other),
        }
    }

    #[test]
    fn test_plan_builds_sockets() {
        let plan = args("10.0.0.1,a.com", Some("80,443")).plan().unwrap();
        assert_eq!(plan.ports.len(), 2);
        assert_eq!(plan.sockets.len(), 4);
    }

    #[test]
    fn test_plan_rejects_bad_target() {
        assert!(matches!(
            args("10.0.0.1,,a.com", Some("80")).plan(),
            Err(CliError::InputValidation(1))
        ));
    }

    #[test]
    fn test_plan_rejects_bad_ports() {
        assert!(matches!(
            args("10.0.0.1", Some("80,http")).plan(),
            Err(CliError::Port(_))
        ));
    }
}
