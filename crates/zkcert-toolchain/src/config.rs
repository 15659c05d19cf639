//! # Toolchain Configuration

use std::time::Duration;

/// Programs, artifact names and timeouts used by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainConfig {
    /// Program used for the `execute` step.
    pub nargo_bin: String,
    /// Program used for the `prove` and `verify` steps.
    pub bb_bin: String,
    /// Artifact stem: `target/<name>.json` is the compiled circuit and
    /// `target/<name>.gz` the fallback witness path.
    pub circuit_name: String,
    pub execute_timeout: Duration,
    pub prove_timeout: Duration,
    pub verify_timeout: Duration,
}

impl ToolchainConfig {
    pub fn fallback_witness_name(&self) -> String {
        format!("{}.gz", self.circuit_name)
    }
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            nargo_bin: "nargo".to_string(),
            bb_bin: "bb".to_string(),
            circuit_name: "asn".to_string(),
            execute_timeout: Duration::from_secs(180),
            prove_timeout: Duration::from_secs(180),
            verify_timeout: Duration::from_secs(60),
        }
    }
}
