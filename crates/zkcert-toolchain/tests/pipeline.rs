//! End-to-end pipeline runs against shell-script stand-ins for `nargo`
//! and `bb`.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tempfile::TempDir;
use zkcert_core::InputError;
use zkcert_toolchain::{
    CancellationToken, Discovery, Pipeline, PipelineError, ProofRequest, RunWorkspace, Stage,
    ToolchainConfig, Verification,
};

const PROOF_BYTES: &str = "fake-proof-bytes";

struct Fixture {
    _tmp: TempDir,
    template: PathBuf,
    runs: PathBuf,
    bin: PathBuf,
    log: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let template = tmp.path().join("circuit");
        fs::create_dir_all(template.join("src")).unwrap();
        fs::create_dir_all(template.join("target")).unwrap();
        fs::write(template.join("Nargo.toml"), "[package]\nname = \"asn\"\n").unwrap();
        fs::write(template.join("src/main.nr"), "fn main() {}").unwrap();
        fs::write(template.join("target/asn.json"), "{}").unwrap();
        let bin = tmp.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        let log = tmp.path().join("calls.log");
        Self {
            runs: tmp.path().join("runs"),
            template,
            bin,
            log,
            _tmp: tmp,
        }
    }

    fn script(&self, name: &str, body: &str) {
        let path = self.bin.join(name);
        let text = format!(
            "#!/bin/sh\necho \"{name} $*\" >> '{}'\n{body}\n",
            self.log.display()
        );
        fs::write(&path, text).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    /// `nargo` that writes a package-named witness, as the real tool does.
    fn working_nargo(&self) {
        self.script(
            "nargo",
            "mkdir -p target\nprintf witness > target/asn_pkg.gz\necho '[asn] Circuit witness successfully solved'",
        );
    }

    /// `bb` whose `prove` writes to the `-o` path and whose `verify` exits
    /// with `verify_status`.
    fn bb(&self, prove_status: i32, verify_status: i32) {
        self.script(
            "bb",
            &format!(
                r#"case "$1" in
  prove)
    [ {prove_status} -eq 0 ] || {{ echo 'prove failed' >&2; exit {prove_status}; }}
    out=""
    while [ $# -gt 0 ]; do
      if [ "$1" = "-o" ]; then out="$2"; fi
      shift
    done
    printf '{PROOF_BYTES}' > "$out"
    ;;
  prove_ultra_honk)
    exit {prove_status}
    ;;
  verify)
    [ {verify_status} -eq 0 ] && echo 'Proof verified' || echo 'verification failed' >&2
    exit {verify_status}
    ;;
esac"#
            ),
        );
    }

    fn with_vk(&self) {
        fs::write(self.template.join("target/vk"), "vk").unwrap();
    }

    fn pipeline(&self) -> Pipeline {
        Pipeline::new(ToolchainConfig {
            nargo_bin: self.bin.join("nargo").display().to_string(),
            bb_bin: self.bin.join("bb").display().to_string(),
            circuit_name: "asn".to_string(),
            execute_timeout: Duration::from_secs(10),
            prove_timeout: Duration::from_secs(10),
            verify_timeout: Duration::from_secs(10),
        })
    }

    async fn workspace(&self) -> RunWorkspace {
        RunWorkspace::prepare(&self.template, &self.runs).await.unwrap()
    }

    fn calls(&self) -> Vec<String> {
        fs::read_to_string(&self.log)
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

fn request() -> ProofRequest {
    ProofRequest {
        certificate: vec![0x30, 0x82, 0x01, 0x0a],
        rdn: "Test".to_string(),
        check_rdn: true,
        check_validity: true,
        date: Some("2025-06-20".to_string()),
    }
}

fn ends_with(path: &Path, tail: &str) -> bool {
    path.to_string_lossy().ends_with(tail)
}

#[tokio::test]
async fn success_without_vk_skips_verification() {
    let fx = Fixture::new();
    fx.working_nargo();
    fx.bb(0, 0);
    let ws = fx.workspace().await;

    let result = fx
        .pipeline()
        .run(&ws, &request(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.run_id, ws.id());
    assert_eq!(result.stage, Stage::Done);
    assert_eq!(result.verification, Verification::Skipped);
    assert_eq!(
        result.verify_output.as_deref(),
        Some("vk not found; skip local verification")
    );
    assert_eq!(result.witness.discovery, Discovery::NewestByMtime);
    assert!(ends_with(&result.witness.path, "target/asn_pkg.gz"));
    assert_eq!(result.proof.path, ws.proof_path());
    assert_eq!(result.proof_size, Some(PROOF_BYTES.len() as u64));
    let digest = result.proof_sha256.unwrap();
    assert_eq!(digest.len(), 64);
    assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    assert!(result.timings.verify_ms.is_none());

    let document = fs::read_to_string(ws.document_path()).unwrap();
    assert!(document.starts_with("certificate_bytes = [0x30, 0x82, 0x01, 0x0a, 0x00"));
    assert!(document.contains("\ncheck_rdn = 1\ncheck_validity = 1\n"));
    assert!(document.contains("user_date = [0x32, 0x35, 0x30, 0x36, 0x32, 0x30, 0x31, 0x32"));

    let calls = fx.calls();
    assert_eq!(calls.len(), 2, "{calls:?}");
    assert!(calls[0].starts_with("nargo execute --toml "));
    assert!(calls[1].starts_with("bb prove -w "));
}

#[tokio::test]
async fn vk_present_and_verify_succeeds() {
    let fx = Fixture::new();
    fx.with_vk();
    fx.working_nargo();
    fx.bb(0, 0);
    let ws = fx.workspace().await;

    let result = fx
        .pipeline()
        .run(&ws, &request(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.verification, Verification::Verified);
    assert!(result.verify_output.unwrap().contains("Proof verified"));
    assert!(result.timings.verify_ms.is_some());
    assert!(fx.calls().last().unwrap().starts_with("bb verify -p "));
}

#[tokio::test]
async fn failed_verification_still_returns_proof() {
    let fx = Fixture::new();
    fx.with_vk();
    fx.working_nargo();
    fx.bb(0, 1);
    let ws = fx.workspace().await;

    let result = fx
        .pipeline()
        .run(&ws, &request(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.verification, Verification::Failed);
    assert_eq!(result.stage, Stage::Done);
    assert_eq!(result.proof_size, Some(PROOF_BYTES.len() as u64));
    // Both `-v` and `-k` spellings were attempted.
    let verifies = fx.calls().iter().filter(|c| c.starts_with("bb verify")).count();
    assert_eq!(verifies, 2);
}

#[tokio::test]
async fn missing_nargo_aborts_before_prove() {
    let fx = Fixture::new();
    fx.bb(0, 0);
    let ws = fx.workspace().await;

    let err = fx
        .pipeline()
        .run(&ws, &request(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::ExecutionFailed(_)), "{err}");
    assert_eq!(err.last_completed(), Stage::DocumentWritten);
    assert_eq!(err.failed_stage(), "execute");
    assert!(ws.document_path().is_file());
    assert!(!ws.proof_path().exists());
    assert!(fx.calls().is_empty());
}

#[tokio::test]
async fn execute_failure_reports_output_excerpt() {
    let fx = Fixture::new();
    fx.script("nargo", "echo 'Failed constraint' >&2\nexit 1");
    fx.bb(0, 0);
    let ws = fx.workspace().await;

    let err = fx
        .pipeline()
        .run(&ws, &request(), &CancellationToken::new())
        .await
        .unwrap_err();

    let last = err.invoke_error().and_then(|e| e.last_failure()).unwrap();
    assert_eq!(last.excerpt().map(str::trim), Some("Failed constraint"));
    // All three `execute` spellings ran.
    assert_eq!(fx.calls().len(), 3);
}

#[tokio::test]
async fn prove_failure_keeps_witness() {
    let fx = Fixture::new();
    fx.working_nargo();
    fx.bb(2, 0);
    let ws = fx.workspace().await;

    let err = fx
        .pipeline()
        .run(&ws, &request(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::ProveFailed(_)), "{err}");
    assert_eq!(err.last_completed(), Stage::WitnessResolved);
    assert!(ws.target_dir().join("asn_pkg.gz").is_file());
    assert!(!ws.proof_path().exists());
}

#[tokio::test]
async fn invalid_input_spawns_nothing() {
    let fx = Fixture::new();
    fx.working_nargo();
    fx.bb(0, 0);
    let pipeline = fx.pipeline();

    let ws = fx.workspace().await;
    let bad_pem = ProofRequest {
        certificate: b"-----BEGIN CERTIFICATE-----\n@@@@\n-----END CERTIFICATE-----\n".to_vec(),
        ..request()
    };
    let err = pipeline
        .run(&ws, &bad_pem, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::InvalidInput(InputError::MalformedPem(_))
    ));

    let ws = fx.workspace().await;
    let wide_rdn = ProofRequest {
        rdn: "Zürich €".to_string(),
        ..request()
    };
    let err = pipeline
        .run(&ws, &wide_rdn, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::InvalidInput(InputError::CharOutOfRange { index: 7, .. })
    ));
    assert_eq!(err.last_completed(), Stage::Start);
    assert!(!ws.document_path().exists());

    assert!(fx.calls().is_empty());
}

#[tokio::test]
async fn cancellation_kills_running_stage() {
    let fx = Fixture::new();
    fx.script("nargo", "sleep 30");
    fx.bb(0, 0);
    let ws = fx.workspace().await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = fx.pipeline().run(&ws, &request(), &cancel).await.unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(matches!(
        err,
        PipelineError::Cancelled {
            after: Stage::DocumentWritten
        }
    ));
    // The remaining `execute` spellings were not attempted.
    assert_eq!(fx.calls().len(), 1);
}

#[tokio::test]
async fn prove_success_without_proof_file_leaves_size_absent() {
    let fx = Fixture::new();
    fx.working_nargo();
    fx.script("bb", "exit 0");
    let ws = fx.workspace().await;

    let result = fx
        .pipeline()
        .run(&ws, &request(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.stage, Stage::Done);
    assert_eq!(result.proof.path, ws.proof_path());
    assert!(!ws.proof_path().exists());
    assert_eq!(result.proof_size, None);
    assert_eq!(result.proof_sha256, None);
    assert_eq!(result.verification, Verification::Skipped);
}
