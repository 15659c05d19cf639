//! # Application State
//!
//! Configuration read from the environment at startup, and the shared state
//! handed to every route handler via the `State` extractor.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusHandle;
use thiserror::Error;
use zkcert_toolchain::{Pipeline, RunRetention, ToolchainConfig};

/// Default listen port.
pub const DEFAULT_PORT: u16 = 5000;

/// Default multipart body limit (1 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 1024 * 1024;

/// Default number of finished run directories kept on disk.
pub const DEFAULT_MAX_RETAINED_RUNS: usize = 100;

/// Log output format selected by `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// An environment variable held a value that could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server on.
    pub port: u16,
    /// Circuit project copied into every run directory.
    pub circuit_dir: PathBuf,
    /// Parent of per-run directories.
    pub runs_dir: PathBuf,
    pub toolchain: ToolchainConfig,
    /// Keep run directories after the response is built.
    pub retain_runs: bool,
    /// Oldest retained runs are pruned past this many.
    pub max_retained_runs: usize,
    pub max_upload_bytes: usize,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        let circuit_dir = PathBuf::from("./circuits");
        Self {
            port: DEFAULT_PORT,
            runs_dir: circuit_dir.join("runs"),
            circuit_dir,
            toolchain: ToolchainConfig::default(),
            retain_runs: true,
            max_retained_runs: DEFAULT_MAX_RETAINED_RUNS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            log_format: LogFormat::Text,
        }
    }
}

impl AppConfig {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup. Unset
    /// variables take their defaults; set but unparsable ones are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();
        let tc = defaults.toolchain.clone();

        let circuit_dir = var("CIRCUIT_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.circuit_dir);
        let runs_dir = var("RUNS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| circuit_dir.join("runs"));

        Ok(Self {
            port: parse_or("PORT", var("PORT"), defaults.port)?,
            circuit_dir,
            runs_dir,
            toolchain: ToolchainConfig {
                nargo_bin: var("NARGO_BIN").unwrap_or(tc.nargo_bin),
                bb_bin: var("BB_BIN").unwrap_or(tc.bb_bin),
                circuit_name: var("CIRCUIT_NAME").unwrap_or(tc.circuit_name),
                execute_timeout: secs_or(
                    "EXECUTE_TIMEOUT_SECS",
                    var("EXECUTE_TIMEOUT_SECS"),
                    tc.execute_timeout,
                )?,
                prove_timeout: secs_or(
                    "PROVE_TIMEOUT_SECS",
                    var("PROVE_TIMEOUT_SECS"),
                    tc.prove_timeout,
                )?,
                verify_timeout: secs_or(
                    "VERIFY_TIMEOUT_SECS",
                    var("VERIFY_TIMEOUT_SECS"),
                    tc.verify_timeout,
                )?,
            },
            retain_runs: match var("RETAIN_RUNS") {
                Some(v) => parse_bool("RETAIN_RUNS", &v)?,
                None => defaults.retain_runs,
            },
            max_retained_runs: parse_or(
                "MAX_RETAINED_RUNS",
                var("MAX_RETAINED_RUNS"),
                defaults.max_retained_runs,
            )?,
            max_upload_bytes: parse_or(
                "MAX_UPLOAD_BYTES",
                var("MAX_UPLOAD_BYTES"),
                defaults.max_upload_bytes,
            )?,
            log_format: match var("LOG_FORMAT").as_deref().map(str::trim) {
                None | Some("text") => LogFormat::Text,
                Some("json") => LogFormat::Json,
                Some(other) => return Err(invalid("LOG_FORMAT", other, "expected text or json")),
            },
        })
    }
}

fn invalid(var: &'static str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_or<T>(var: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(v) => v.trim().parse().map_err(|e| invalid(var, &v, e)),
        None => Ok(default),
    }
}

fn secs_or(
    var: &'static str,
    value: Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match value {
        Some(v) => match v.trim().parse::<u64>() {
            Ok(0) => Err(invalid(var, &v, "timeout must be positive")),
            Ok(secs) => Ok(Duration::from_secs(secs)),
            Err(e) => Err(invalid(var, &v, e)),
        },
        None => Ok(default),
    }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(invalid(var, value, "expected a boolean")),
    }
}

/// Shared application state passed to all route handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pipeline: Arc<Pipeline>,
    /// Finished run directories still on disk.
    pub retention: Arc<RunRetention>,
    /// Prometheus render handle; `None` when no recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let pipeline = Pipeline::new(config.toolchain.clone());
        let retention = RunRetention::new(config.max_retained_runs);
        Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
            retention: Arc::new(retention),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
