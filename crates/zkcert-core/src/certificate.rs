//! # Certificate Normalization
//!
//! Uploads arrive either as DER or as PEM. The circuit wants DER, so PEM
//! input has its `-----BEGIN …-----` / `-----END …-----` delimiters and all
//! whitespace stripped, then the remaining body is base64-decoded.
//!
//! This is an encoding-layer transform only. Nothing here parses ASN.1.

use std::borrow::Cow;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;

use crate::error::InputError;

const PEM_MARKER: &str = "-----BEGIN";
const DELIMITER: &str = "-----";

/// Standard alphabet, padding optional on decode.
const PEM_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Whether `raw` looks like PEM text.
pub fn is_pem(raw: &[u8]) -> bool {
    String::from_utf8_lossy(raw).contains(PEM_MARKER)
}

/// Return the DER form of `raw`.
///
/// Binary input is borrowed back unchanged, so normalizing twice is a
/// no-op: `normalize(normalize(b)) == normalize(b)`.
pub fn normalize(raw: &[u8]) -> Result<Cow<'_, [u8]>, InputError> {
    let text = String::from_utf8_lossy(raw);
    if !text.contains(PEM_MARKER) {
        return Ok(Cow::Borrowed(raw));
    }
    let body: String = strip_delimiters(&text)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    PEM_BASE64
        .decode(body.as_bytes())
        .map(Cow::Owned)
        .map_err(|e| InputError::MalformedPem(e.to_string()))
}

/// Remove every `-----BEGIN <label>-----` and `-----END <label>-----`.
fn strip_delimiters(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = find_delimiter(rest) {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + DELIMITER.len()..];
        match after_open.find(DELIMITER) {
            Some(close) => rest = &after_open[close + DELIMITER.len()..],
            None => {
                // Unterminated delimiter: drop the remainder of the line.
                rest = after_open.find('\n').map_or("", |nl| &after_open[nl..]);
            }
        }
    }
    out.push_str(rest);
    out
}

fn find_delimiter(text: &str) -> Option<usize> {
    let begin = text.find("-----BEGIN ");
    let end = text.find("-----END ");
    match (begin, end) {
        (Some(b), Some(e)) => Some(b.min(e)),
        (b, e) => b.or(e),
    }
}
