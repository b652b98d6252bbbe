mod cli;
mod commands;
mod error;
mod logging;
mod utils;

use crate::cli::{Cli, Commands};
use crate::error::Result;
use clap::{CommandFactory, Parser};
use tracing::{debug, error, info};

fn main() {
    if let Err(e) = run_app() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run_app() -> Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.clone())?;

    info!("hti_ice v{} starting up.", env!("CARGO_PKG_VERSION"));
    debug!("Full CLI arguments parsed: {:?}", &cli);

    let command_result = dispatch(cli);

    match &command_result {
        Ok(()) => info!("Command completed successfully."),
        Err(e) => error!("Command failed: {}", e),
    }
    command_result
}

fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Commands::Gen(args)) => {
            info!("Dispatching to 'gen' command.");
            commands::generate::run(args)
        }
        Some(Commands::Refine(args)) => {
            info!("Dispatching to 'refine' command.");
            commands::refine::run(args)
        }
        Some(Commands::Compute(args)) => {
            info!("Dispatching to 'compute' command.");
            commands::compute::run(args)
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;

    #[test]
    fn missing_subcommand_prints_help_and_succeeds() {
        let cli = Cli::try_parse_from(["hti_ice"]).unwrap();
        assert!(dispatch(cli).is_ok());
    }

    #[test]
    fn command_errors_are_returned() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        let cli = Cli::try_parse_from(["hti_ice", "gen", missing.to_str().unwrap()]).unwrap();
        assert!(matches!(dispatch(cli), Err(CliError::Param(_))));
    }
}
