//! # zkcert CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use zkcert_cli::document::{run_toml, TomlArgs};
use zkcert_cli::prove::{run_prove, ProveArgs};

/// zkcert: zero-knowledge proofs over X.509 certificates.
///
/// Encodes certificates into circuit inputs and drives the nargo/bb
/// toolchain to execute, prove and verify.
#[derive(Parser, Debug)]
#[command(name = "zkcert", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write Prover.toml for a certificate without running the toolchain.
    Toml(TomlArgs),

    /// Run execute, prove and verify in an isolated copy of a circuit project.
    Prove(ProveArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    // Logs go to stderr; stdout carries command output.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Toml(args) => run_toml(args),
        Commands::Prove(args) => run_prove(args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
