//! # Error Hierarchy
//!
//! Structured errors for the encoding layer, built with `thiserror`.
//! Every variant here is a client-side input problem: it is reported
//! before any external process is spawned.

use thiserror::Error;

/// Input rejected by the encoding layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// The value is neither text, a byte buffer, nor a sequence of
    /// byte-like values.
    #[error("invalid input kind: {0}")]
    InvalidInputKind(String),

    /// A sequence element could not be read as a single byte.
    #[error("element {index} is not a byte value: {value}")]
    InvalidByteValue {
        /// Position of the offending element.
        index: usize,
        /// The element as received.
        value: String,
    },

    /// A text character does not fit in one byte.
    #[error("character {ch:?} at position {index} is outside the single-byte range (U+{code:04X} > U+00FF)")]
    CharOutOfRange {
        /// The offending character.
        ch: char,
        /// Its code point.
        code: u32,
        /// Character position within the input.
        index: usize,
    },

    /// PEM-delimited input whose body is not valid base64.
    #[error("malformed PEM body: {0}")]
    MalformedPem(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_out_of_range_message_names_code_point() {
        let err = InputError::CharOutOfRange {
            ch: 'Ω',
            code: 'Ω' as u32,
            index: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("U+03A9"), "got: {msg}");
        assert!(msg.contains("position 3"), "got: {msg}");
    }

    #[test]
    fn invalid_byte_value_message() {
        let err = InputError::InvalidByteValue {
            index: 7,
            value: "0x1ff".to_string(),
        };
        assert_eq!(err.to_string(), "element 7 is not a byte value: 0x1ff");
    }
}
