//! # zkcert-cli — CLI Tool for zkcert
//!
//! Provides the `zkcert` command-line interface.
//!
//! ## Subcommands
//!
//! - `zkcert toml`: encode a certificate and parameters into `Prover.toml`.
//! - `zkcert prove`: run execute → prove → verify locally in an isolated
//!   copy of a circuit project and print the result as JSON.
//!
//! ```bash
//! zkcert toml --cert cert.pem --rdn "Test" --check-rdn --date 2025-06-20
//! zkcert toml --cert-json bytes.json --out-dir circuits/asn
//! zkcert prove --circuit-dir circuits/asn --cert cert.der --check-validity
//! ```

pub mod document;
pub mod prove;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use zkcert_core::{certificate, encode, ByteSource, InputDocument, CERTIFICATE_LEN};

/// Where the certificate comes from.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct CertSource {
    /// Certificate file, DER or PEM.
    #[arg(long, value_name = "FILE")]
    pub cert: Option<PathBuf>,

    /// JSON array of byte values: numbers or strings such as "0x30" or "48".
    #[arg(long, value_name = "FILE")]
    pub cert_json: Option<PathBuf>,
}

/// Circuit inputs shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    #[command(flatten)]
    pub source: CertSource,

    /// Expected first RDN attribute.
    #[arg(long, default_value = "")]
    pub rdn: String,

    /// Ask the circuit to check the first RDN attribute.
    #[arg(long)]
    pub check_rdn: bool,

    /// Ask the circuit to check the certificate validity window.
    #[arg(long)]
    pub check_validity: bool,

    /// `YYMMDDhhmmssZ` or a calendar date such as 2025-06-20.
    #[arg(long, default_value = "")]
    pub date: String,
}

impl InputArgs {
    /// Certificate bytes, DER-normalized.
    pub fn certificate(&self) -> Result<Vec<u8>> {
        if let Some(path) = &self.source.cert {
            let raw = std::fs::read(path)
                .with_context(|| format!("failed to read certificate: {}", path.display()))?;
            let der = certificate::normalize(&raw)
                .with_context(|| format!("invalid certificate: {}", path.display()))?;
            return Ok(der.into_owned());
        }
        if let Some(path) = &self.source.cert_json {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read file: {}", path.display()))?;
            let value: serde_json::Value = serde_json::from_str(&text)
                .with_context(|| format!("failed to parse JSON: {}", path.display()))?;
            let field = ByteSource::from_json(&value)
                .and_then(|source| encode(source, CERTIFICATE_LEN))
                .with_context(|| format!("invalid certificate bytes: {}", path.display()))?;
            return Ok(field.as_bytes().to_vec());
        }
        anyhow::bail!("one of --cert or --cert-json is required")
    }

    /// Build the encoded input document.
    pub fn document(&self) -> Result<InputDocument> {
        let certificate = self.certificate()?;
        InputDocument::build(
            &certificate,
            &self.rdn,
            self.check_rdn,
            self.check_validity,
            &self.date,
        )
        .context("failed to encode circuit inputs")
    }
}
