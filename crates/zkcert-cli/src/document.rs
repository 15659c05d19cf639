//! # Toml Subcommand
//!
//! Writes `Prover.toml` without running the toolchain. Useful for preparing
//! a circuit project by hand or diffing encoder output.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::InputArgs;

/// Arguments for the `zkcert toml` subcommand.
#[derive(Args, Debug)]
pub struct TomlArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Directory to write `Prover.toml` into.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub out_dir: PathBuf,
}

/// Execute the toml subcommand. Prints the absolute document path.
pub fn run_toml(args: &TomlArgs) -> Result<u8> {
    let document = args.input.document()?;
    let path = document
        .write_to(&args.out_dir)
        .with_context(|| format!("failed to write Prover.toml to {}", args.out_dir.display()))?;
    tracing::info!(path = %path.display(), "input document written");
    println!("{}", path.display());
    Ok(0)
}
