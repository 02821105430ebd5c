//! # Protoharvest CLI Entry Point
//!
//! The main executable for the Protoharvest tool. This file drives the application lifecycle:
//!
//! 1. **Initialization**: Parses command-line arguments using [`cli::Cli`] and installs logging.
//! 2. **Discovery**: Connects to the target server and computes the schema files of its services.
//! 3. **Generation**: Emits those files and drives `protoc` over them (`generate` only).
//! 4. **Presentation**: Prints the outcome, or a categorised error before exiting with status 1.

mod cli;
mod formatter;
mod harvest;

use clap::Parser;
use cli::{Cli, Commands};
use formatter::FormattedString;
use std::process;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        Commands::List { exclusions } => {
            match harvest::discover(&args.url, args.timeout, &exclusions.filter()).await {
                Ok(discovery) => println!("{}", FormattedString::from(&discovery)),
                Err(err) => exit_with(err),
            }
        }
        Commands::Generate(generate) => {
            match harvest::generate(&args.url, args.timeout, generate).await {
                Ok(report) => println!("{}", FormattedString::from(&report)),
                Err(err) => exit_with(err),
            }
        }
    }
}

fn exit_with(err: harvest::HarvestError) -> ! {
    tracing::debug!(error = ?err, "Harvest failed");
    eprintln!("{}", FormattedString::from(err));
    process::exit(1);
}
