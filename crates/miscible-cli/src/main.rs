mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod utils;

use crate::cli::{Cli, Commands};
use crate::error::{CliError, Result};
use clap::Parser;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = run_app().await {
        eprintln!("\n❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn run_app() -> Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;

    let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default().into_hooks();
    eyre_hook.install().map_err(|e| CliError::Other(e.into()))?;
    std::panic::set_hook(Box::new(move |pi| {
        error!("{}", panic_hook.panic_report(pi));
    }));

    info!("miscible CLI v{} starting up.", env!("CARGO_PKG_VERSION"));
    debug!("Full CLI arguments parsed: {:?}", &cli);

    if let Some(num_threads) = cli.threads {
        info!(
            "Setting Rayon global thread pool to {} threads.",
            num_threads
        );
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .map_err(|e| {
                CliError::Other(anyhow::anyhow!("Failed to build global thread pool: {}", e))
            })?;
    }

    let command_result = match cli.command {
        Commands::Search(args) => {
            info!("Dispatching to 'search' command.");
            commands::search::run(args).await
        }
        Commands::Screen(args) => {
            info!("Dispatching to 'screen' command.");
            commands::screen::run(args).await
        }
        Commands::Hull(args) => {
            info!("Dispatching to 'hull' command.");
            commands::hull::run(args).await
        }
    };

    match &command_result {
        Ok(()) => info!("Command completed successfully."),
        Err(e) => error!("Command failed: {}", e),
    }
    command_result
}
