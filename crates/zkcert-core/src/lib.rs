#![deny(missing_docs)]

//! # zkcert-core — Circuit Input Encoding
//!
//! Turns an uploaded certificate and its verification parameters into the
//! `Prover.toml` document consumed by the circuit toolchain. Pure data
//! transforms only: no processes, no network. The sole filesystem touch is
//! [`InputDocument::write_to`].
//!
//! ## Pipeline position
//!
//! ```text
//! upload ─► certificate::normalize ─► InputDocument::build ─► Prover.toml
//!                                       │
//!                    encoding::encode ◄─┤
//!                 date::canonicalize ◄──┘
//! ```
//!
//! ## Crate Policy
//!
//! - Every encoded field has a fixed width; see [`encoding`].
//! - All failures are [`InputError`]s, i.e. client input problems.

pub mod certificate;
pub mod date;
pub mod document;
pub mod encoding;
pub mod error;

pub use document::{InputDocument, DOCUMENT_FILE_NAME};
pub use encoding::{
    encode, encode_bytes, encode_str, ByteSource, EncodedField, CERTIFICATE_LEN, DATE_LEN,
    RDN_LEN,
};
pub use error::InputError;
