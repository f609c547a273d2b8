//! PageHawk command-line entry point.

use clap::Parser;
use pagehawk::cli::{Cli, Commands};
use pagehawk::{logging, output};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = match &cli.command {
        Commands::Scan(cmd) => {
            cmd.execute(cli.config.as_deref(), cli.verbose, cli.quiet)
                .await
        }
        Commands::Resolve(cmd) => cmd.execute(),
    };

    if let Err(e) = result {
        output::print_error(&e.to_string());
        std::process::exit(1);
    }

    Ok(())
}
