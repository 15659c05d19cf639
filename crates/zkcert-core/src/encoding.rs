//! # Fixed-Width Byte-Array Encoding
//!
//! Every circuit input is a fixed-size `u8` array. This module turns text,
//! raw buffers, or sequences of loosely-typed byte values into an
//! [`EncodedField`] of exactly `N` bytes: longer inputs lose their tail,
//! shorter ones are right-padded with `0x00`.
//!
//! ## Text policy
//!
//! Each character maps to its code point. Characters above U+00FF do not
//! fit in a single byte and are rejected with
//! [`InputError::CharOutOfRange`]; they are never silently truncated.
//!
//! Only the first `N` elements of any input are inspected, so truncation is
//! a pure prefix operation: `encode(s, N) == encode(&s[..N], N)` holds even
//! when the discarded tail would have been rejected.

use std::fmt;

use serde_json::Value;

use crate::error::InputError;

/// Width of the `certificate_bytes` field.
pub const CERTIFICATE_LEN: usize = 512;

/// Width of the `rdn_first_attribute` field.
pub const RDN_LEN: usize = 64;

/// Width of the `user_date` field.
pub const DATE_LEN: usize = 16;

/// Input accepted by [`encode`].
#[derive(Debug, Clone, Copy)]
pub enum ByteSource<'a> {
    /// Absent input; encodes to all zeros.
    Empty,
    /// Text, one byte per character.
    Text(&'a str),
    /// Raw binary buffer.
    Bytes(&'a [u8]),
    /// Mixed sequence of JSON numbers and numeric strings
    /// (`"0x30"`, `"0X0A"`, `"48"`).
    Values(&'a [Value]),
}

impl<'a> ByteSource<'a> {
    /// Classify an arbitrary JSON value.
    ///
    /// Strings are text, arrays are byte-value sequences and `null` is
    /// empty. Anything else is an [`InputError::InvalidInputKind`].
    pub fn from_json(value: &'a Value) -> Result<Self, InputError> {
        match value {
            Value::Null => Ok(Self::Empty),
            Value::String(s) => Ok(Self::Text(s)),
            Value::Array(items) => Ok(Self::Values(items)),
            Value::Bool(_) => Err(InputError::InvalidInputKind(
                "expected string, byte buffer or array of byte values, got boolean".into(),
            )),
            Value::Number(_) => Err(InputError::InvalidInputKind(
                "expected string, byte buffer or array of byte values, got number".into(),
            )),
            Value::Object(_) => Err(InputError::InvalidInputKind(
                "expected string, byte buffer or array of byte values, got object".into(),
            )),
        }
    }
}

impl<'a> From<&'a str> for ByteSource<'a> {
    fn from(s: &'a str) -> Self {
        Self::Text(s)
    }
}

impl<'a> From<&'a [u8]> for ByteSource<'a> {
    fn from(b: &'a [u8]) -> Self {
        Self::Bytes(b)
    }
}

/// A fixed-width byte array ready to be rendered into the input document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EncodedField {
    bytes: Vec<u8>,
}

impl EncodedField {
    /// An all-zero field of width `len`.
    pub fn zeroed(len: usize) -> Self {
        Self {
            bytes: vec![0; len],
        }
    }

    /// Field width. Always the `N` it was encoded with.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the field has zero width.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The raw byte values.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Each byte as `0x`-prefixed, two-digit lowercase hex.
    pub fn to_hex_strings(&self) -> Vec<String> {
        self.bytes.iter().map(|b| format!("0x{b:02x}")).collect()
    }
}

/// Renders as an array literal: `[0x30, 0x82, 0x00]`.
impl fmt::Display for EncodedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, b) in self.bytes.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "0x{b:02x}")?;
        }
        f.write_str("]")
    }
}

/// Encode `source` into exactly `len` bytes.
pub fn encode(source: ByteSource<'_>, len: usize) -> Result<EncodedField, InputError> {
    let mut bytes = Vec::with_capacity(len);
    match source {
        ByteSource::Empty => {}
        ByteSource::Text(s) => {
            for (index, ch) in s.chars().take(len).enumerate() {
                let code = ch as u32;
                let byte = u8::try_from(code)
                    .map_err(|_| InputError::CharOutOfRange { ch, code, index })?;
                bytes.push(byte);
            }
        }
        ByteSource::Bytes(b) => bytes.extend_from_slice(&b[..b.len().min(len)]),
        ByteSource::Values(values) => {
            for (index, value) in values.iter().take(len).enumerate() {
                bytes.push(value_to_byte(index, value)?);
            }
        }
    }
    bytes.resize(len, 0);
    Ok(EncodedField { bytes })
}

/// Encode a raw buffer. Infallible: every `u8` is already a byte.
pub fn encode_bytes(bytes: &[u8], len: usize) -> EncodedField {
    let mut out = bytes[..bytes.len().min(len)].to_vec();
    out.resize(len, 0);
    EncodedField { bytes: out }
}

/// Encode text, one byte per character.
pub fn encode_str(s: &str, len: usize) -> Result<EncodedField, InputError> {
    encode(ByteSource::Text(s), len)
}

/// Parse a single byte from a numeric string.
///
/// Accepts `0x`/`0X`-prefixed hex with one or two digits, or a decimal
/// in `0..=255`. Surrounding whitespace is ignored.
pub fn parse_byte(s: &str) -> Option<u8> {
    let s = s.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) if (1..=2).contains(&hex.len()) => u8::from_str_radix(hex, 16).ok(),
        Some(_) => None,
        None => s.parse::<u8>().ok(),
    }
}

fn value_to_byte(index: usize, value: &Value) -> Result<u8, InputError> {
    let byte = match value {
        Value::Number(n) => n.as_u64().and_then(|n| u8::try_from(n).ok()),
        Value::String(s) => parse_byte(s),
        _ => None,
    };
    byte.ok_or_else(|| InputError::InvalidByteValue {
        index,
        value: value.to_string(),
    })
}
