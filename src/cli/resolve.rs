//! Resolve subcommand implementation.
//!
//! Dry run: prints the sockets a scan would visit without touching the network.

use super::TargetArgs;
use crate::error::CliResult;
use crate::output;
use crate::storage::VisitStore;
use clap::Parser;

/// Resolve targets and print the socket task list.
#[derive(Parser, Debug)]
pub struct ResolveCommand {
    #[command(flatten)]
    pub targets: TargetArgs,

    /// Print the initial visit state as JSON instead of one socket per line
    #[arg(long)]
    pub json: bool,
}

impl ResolveCommand {
    /// Execute the resolve command.
    pub fn execute(&self) -> CliResult<()> {
        let plan = self.targets.plan()?;
        tracing::info!("Resolved {} sockets", plan.sockets.len());

        if self.json {
            output::print_json(&VisitStore::from_sockets(&plan.sockets))?;
        } else {
            output::print_sockets(&plan.sockets)?;
        }
        Ok(())
    }
}
