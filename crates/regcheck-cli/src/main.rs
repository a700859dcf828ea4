//! # regcheck CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use regcheck_cli::cep::{run_cep, CepArgs};
use regcheck_cli::check::{run_check, CheckArgs};
use regcheck_cli::normalize::{run_normalize, NormalizeArgs};

/// Phone number registration and Brazilian postal code checks.
#[derive(Parser, Debug)]
#[command(name = "regcheck", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the canonical form of phone numbers (offline).
    Normalize(NormalizeArgs),

    /// Validate postal codes against ViaCEP.
    Cep(CepArgs),

    /// Check phone numbers against a registration bridge.
    Check(CheckArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays parseable.
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Normalize(args) => run_normalize(&args),
        Commands::Cep(args) => run_cep(&args).await,
        Commands::Check(args) => run_check(&args).await,
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
