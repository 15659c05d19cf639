//! # Prove Subcommand
//!
//! Runs the full pipeline against a local circuit project. The project is
//! copied into `<runs-dir>/<uuid>/` first, exactly as the HTTP service does,
//! so the source tree is never written to.
//!
//! Exit codes: 0 when a proof was produced and verified or verification was
//! skipped, 2 when verification ran and failed, 1 on any error.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use zkcert_toolchain::{
    CancellationToken, Pipeline, ProofRequest, RunWorkspace, ToolchainConfig, Verification,
};

use crate::InputArgs;

/// Arguments for the `zkcert prove` subcommand.
#[derive(Args, Debug)]
pub struct ProveArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Circuit project to run (holds `Nargo.toml` and `target/`).
    #[arg(long, value_name = "DIR", default_value = "./circuits")]
    pub circuit_dir: PathBuf,

    /// Parent of per-run directories. Defaults to `<circuit-dir>/runs`.
    #[arg(long, value_name = "DIR")]
    pub runs_dir: Option<PathBuf>,

    /// Circuit artifact stem (`target/<name>.json`).
    #[arg(long, default_value = "asn")]
    pub circuit_name: String,

    /// Program for the execute step.
    #[arg(long, default_value = "nargo")]
    pub nargo: String,

    /// Program for the prove and verify steps.
    #[arg(long, default_value = "bb")]
    pub bb: String,

    /// Per-variant timeout for execute and prove, in seconds.
    #[arg(long, default_value_t = 180)]
    pub timeout_secs: u64,

    /// Delete the run directory after printing the result.
    #[arg(long)]
    pub cleanup: bool,
}

impl ProveArgs {
    fn toolchain(&self) -> ToolchainConfig {
        let defaults = ToolchainConfig::default();
        let timeout = Duration::from_secs(self.timeout_secs.max(1));
        ToolchainConfig {
            nargo_bin: self.nargo.clone(),
            bb_bin: self.bb.clone(),
            circuit_name: self.circuit_name.clone(),
            execute_timeout: timeout,
            prove_timeout: timeout,
            verify_timeout: defaults.verify_timeout.min(timeout),
        }
    }

    fn runs_dir(&self) -> PathBuf {
        self.runs_dir
            .clone()
            .unwrap_or_else(|| self.circuit_dir.join("runs"))
    }
}

/// Execute the prove subcommand. Prints the pipeline result as JSON.
pub fn run_prove(args: &ProveArgs) -> Result<u8> {
    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(prove(args))
}

async fn prove(args: &ProveArgs) -> Result<u8> {
    let request = ProofRequest {
        certificate: args.input.certificate()?,
        rdn: args.input.rdn.clone(),
        check_rdn: args.input.check_rdn,
        check_validity: args.input.check_validity,
        date: Some(args.input.date.clone()).filter(|d| !d.is_empty()),
    };

    let workspace = RunWorkspace::prepare(&args.circuit_dir, &args.runs_dir())
        .await
        .context("failed to prepare run directory")?;
    tracing::info!(run_id = %workspace.id(), dir = %workspace.dir().display(), "run directory ready");

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted; stopping toolchain");
            on_interrupt.cancel();
        }
    });

    let pipeline = Pipeline::new(args.toolchain());
    let outcome = pipeline.run(&workspace, &request, &cancel).await;
    watcher.abort();

    if args.cleanup {
        let dir = workspace.dir().display().to_string();
        if let Err(e) = workspace.clone().remove().await {
            tracing::warn!(dir = %dir, error = %e, "failed to remove run directory");
        }
    }

    let result = outcome.with_context(|| format!("proof run {} failed", workspace.id()))?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(match result.verification {
        Verification::Verified | Verification::Skipped => 0,
        Verification::Failed => 2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CertSource;
    use std::fs;

    fn args(cert: PathBuf, circuit_dir: PathBuf, bin: &std::path::Path) -> ProveArgs {
        ProveArgs {
            input: InputArgs {
                source: CertSource {
                    cert: Some(cert),
                    cert_json: None,
                },
                rdn: "Test".to_string(),
                check_rdn: true,
                check_validity: false,
                date: "2025-06-20".to_string(),
            },
            circuit_dir,
            runs_dir: None,
            circuit_name: "asn".to_string(),
            nargo: bin.join("nargo").display().to_string(),
            bb: bin.join("bb").display().to_string(),
            timeout_secs: 10,
            cleanup: false,
        }
    }

    #[test]
    fn toolchain_config_follows_flags() {
        let tmp = tempfile::tempdir().unwrap();
        let mut a = args(tmp.path().join("c.der"), tmp.path().to_path_buf(), tmp.path());
        a.timeout_secs = 30;
        let tc = a.toolchain();
        assert_eq!(tc.execute_timeout, Duration::from_secs(30));
        assert_eq!(tc.verify_timeout, Duration::from_secs(30));
        assert_eq!(a.runs_dir(), tmp.path().join("runs"));
    }

    #[test]
    fn missing_circuit_dir_fails_before_running() {
        let tmp = tempfile::tempdir().unwrap();
        let cert = tmp.path().join("c.der");
        fs::write(&cert, [0x30, 0x82, 0x01, 0x0a]).unwrap();
        let a = args(cert, tmp.path().join("missing"), tmp.path());
        let err = run_prove(&a).unwrap_err();
        assert!(format!("{err:#}").contains("circuit directory not found"));
    }

    #[cfg(unix)]
    #[test]
    fn runs_pipeline_with_local_toolchain() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let circuit = tmp.path().join("circuit");
        fs::create_dir_all(circuit.join("target")).unwrap();
        fs::write(circuit.join("target/asn.json"), "{}").unwrap();
        let bin = tmp.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        for (name, body) in [
            ("nargo", "mkdir -p target && printf w > target/asn.gz"),
            ("bb", "shift 6; printf p > \"$1\""),
        ] {
            let path = bin.join(name);
            fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        }
        let cert = tmp.path().join("c.der");
        fs::write(&cert, [0x30, 0x82, 0x01, 0x0a]).unwrap();

        let mut a = args(cert, circuit.clone(), &bin);
        a.cleanup = true;
        assert_eq!(run_prove(&a).unwrap(), 0);
        // Cleaned up, and the template was never written to.
        assert_eq!(fs::read_dir(circuit.join("runs")).unwrap().count(), 0);
        assert!(!circuit.join("Prover.toml").exists());
    }
}
