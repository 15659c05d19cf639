//! # Command Variants
//!
//! Installed toolchain versions disagree on flag spellings. Each logical
//! step (`execute`, `prove`, `verify`) is therefore described as an ordered
//! list of [`CommandVariant`]s; the invoker runs them in order and keeps the
//! first one that exits 0.

use std::fmt;
use std::path::Path;
use std::process::Output;

use serde::Serialize;

/// Maximum number of characters of process output written to logs or
/// returned in error excerpts.
pub const OUTPUT_EXCERPT_CHARS: usize = 500;

/// Bytes kept from each of stdout and stderr; anything past this is read
/// and discarded so the child never blocks on a full pipe.
pub const MAX_CAPTURED_OUTPUT_BYTES: usize = 1024 * 1024;

/// One way to spell a toolchain invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandVariant {
    /// Executable name or path.
    pub program: String,
    /// Arguments, in order.
    pub args: Vec<String>,
}

impl CommandVariant {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for CommandVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Outcome of a process that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessResult {
    /// The command line that produced this result.
    pub command: String,
    /// Exit code; `None` when the process was ended by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// `exit_code == Some(0)`.
    pub success: bool,
}

impl ProcessResult {
    pub(crate) fn from_output(variant: &CommandVariant, output: &Output) -> Self {
        Self {
            command: variant.to_string(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            success: output.status.success(),
        }
    }

    /// Bounded excerpt for diagnostics: stderr if non-empty, else stdout.
    pub fn excerpt(&self) -> &str {
        let text = if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        };
        excerpt(text, OUTPUT_EXCERPT_CHARS)
    }
}

impl fmt::Display for ProcessResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exit_code {
            Some(code) => write!(f, "`{}` exited with status {code}", self.command),
            None => write!(f, "`{}` was terminated by a signal", self.command),
        }
    }
}

/// The first `max_chars` characters of `s`.
pub fn excerpt(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// `nargo execute` spellings. The bare form relies on `Prover.toml` being
/// in the working directory.
pub fn execute_variants(nargo: &str, document: &Path) -> Vec<CommandVariant> {
    let doc = arg(document);
    vec![
        CommandVariant::new(nargo, ["execute", "--toml", doc.as_str()]),
        CommandVariant::new(
            nargo,
            ["execute", "--prover", "toml", "--toml", doc.as_str()],
        ),
        CommandVariant::new(nargo, ["execute"]),
    ]
}

/// `bb prove` spellings.
pub fn prove_variants(
    bb: &str,
    witness: &Path,
    circuit: &Path,
    proof: &Path,
) -> Vec<CommandVariant> {
    let (w, b, o) = (arg(witness), arg(circuit), arg(proof));
    ["prove", "prove_ultra_honk"]
        .into_iter()
        .map(|sub| CommandVariant::new(bb, [sub, "-w", w.as_str(), "-b", b.as_str(), "-o", o.as_str()]))
        .collect()
}

/// `bb verify` spellings; the key flag changed from `-v` to `-k`.
pub fn verify_variants(bb: &str, proof: &Path, vk: &Path) -> Vec<CommandVariant> {
    let (p, k) = (arg(proof), arg(vk));
    ["-v", "-k"]
        .into_iter()
        .map(|flag| CommandVariant::new(bb, ["verify", "-p", p.as_str(), flag, k.as_str()]))
        .collect()
}
