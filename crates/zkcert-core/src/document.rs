//! # Input Document
//!
//! `Prover.toml` is the single input the circuit's `execute` step reads.
//! It holds five keys in fixed order:
//!
//! ```text
//! certificate_bytes = [0x30, 0x82, …]   (512 entries)
//! check_rdn = 1
//! check_validity = 1
//! rdn_first_attribute = [0x54, …]       (64 entries)
//! user_date = [0x32, …]                 (16 entries)
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::date;
use crate::encoding::{encode_bytes, encode_str, EncodedField, CERTIFICATE_LEN, DATE_LEN, RDN_LEN};
use crate::error::InputError;

/// File name the circuit toolchain looks for.
pub const DOCUMENT_FILE_NAME: &str = "Prover.toml";

/// Fully encoded circuit inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDocument {
    /// DER certificate, 512 bytes.
    pub certificate_bytes: EncodedField,
    /// Whether the circuit should match the first RDN attribute.
    pub check_rdn: bool,
    /// Whether the circuit should check the validity window.
    pub check_validity: bool,
    /// Expected first RDN attribute value, 64 bytes.
    pub rdn_first_attribute: EncodedField,
    /// Canonical date, 16 bytes.
    pub user_date: EncodedField,
}

impl InputDocument {
    /// Encode all inputs. `date` is canonicalized before encoding.
    ///
    /// `certificate` must already be DER; see
    /// [`certificate::normalize`](crate::certificate::normalize).
    pub fn build(
        certificate: &[u8],
        rdn: &str,
        check_rdn: bool,
        check_validity: bool,
        date: &str,
    ) -> Result<Self, InputError> {
        let canonical = date::canonicalize(date);
        Ok(Self {
            certificate_bytes: encode_bytes(certificate, CERTIFICATE_LEN),
            check_rdn,
            check_validity,
            rdn_first_attribute: encode_str(rdn, RDN_LEN)?,
            user_date: encode_str(&canonical, DATE_LEN)?,
        })
    }

    /// Render the document text. Lines are `\n`-separated with no trailing
    /// newline.
    pub fn render(&self) -> String {
        [
            format!("certificate_bytes = {}", self.certificate_bytes),
            format!("check_rdn = {}", flag(self.check_rdn)),
            format!("check_validity = {}", flag(self.check_validity)),
            format!("rdn_first_attribute = {}", self.rdn_first_attribute),
            format!("user_date = {}", self.user_date),
        ]
        .join("\n")
    }

    /// Write `Prover.toml` into `dir`, creating the directory if needed
    /// and overwriting any previous document. Returns the absolute path.
    pub fn write_to(&self, dir: &Path) -> io::Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(DOCUMENT_FILE_NAME);
        fs::write(&path, self.render())?;
        fs::canonicalize(path)
    }
}

fn flag(b: bool) -> &'static str {
    if b {
        "1"
    } else {
        "0"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(line: &str) -> Vec<&str> {
        let open = line.find('[').unwrap();
        let close = line.rfind(']').unwrap();
        line[open + 1..close].split(", ").collect()
    }

    #[test]
    fn reference_document() {
        let doc =
            InputDocument::build(&[0x30, 0x82, 0x01, 0x0a], "Test", true, true, "250620120000Z")
                .unwrap();
        let text = doc.render();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);

        assert!(lines[0].starts_with("certificate_bytes = ["));
        let cert = entries(lines[0]);
        assert_eq!(cert.len(), 512);
        assert_eq!(&cert[..4], &["0x30", "0x82", "0x01", "0x0a"]);
        assert!(cert[4..].iter().all(|e| *e == "0x00"));

        assert_eq!(lines[1], "check_rdn = 1");
        assert_eq!(lines[2], "check_validity = 1");

        assert!(lines[3].starts_with("rdn_first_attribute = ["));
        let rdn = entries(lines[3]);
        assert_eq!(rdn.len(), 64);
        assert_eq!(&rdn[..4], &["0x54", "0x65", "0x73", "0x74"]);
        assert!(rdn[4..].iter().all(|e| *e == "0x00"));

        assert!(lines[4].starts_with("user_date = ["));
        let date = entries(lines[4]);
        let expected: Vec<String> = "250620120000Z"
            .bytes()
            .map(|b| format!("0x{b:02x}"))
            .chain(std::iter::repeat("0x00".to_string()).take(3))
            .collect();
        assert_eq!(date, expected);
    }

    #[test]
    fn flags_render_as_zero() {
        let doc = InputDocument::build(&[], "", false, false, "").unwrap();
        let text = doc.render();
        assert!(text.contains("\ncheck_rdn = 0\n"));
        assert!(text.contains("\ncheck_validity = 0\n"));
        assert!(!text.ends_with('\n'));
    }

    #[test]
    fn calendar_date_is_canonicalized() {
        let doc = InputDocument::build(&[], "", false, true, "2025-06-20").unwrap();
        assert_eq!(&doc.user_date.as_bytes()[..13], b"250620120000Z");
    }

    #[test]
    fn wide_rdn_is_rejected() {
        let err = InputDocument::build(&[], "Ωmega", true, false, "").unwrap_err();
        assert!(matches!(err, InputError::CharOutOfRange { index: 0, .. }));
    }

    #[test]
    fn write_creates_directory_and_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("circuit");

        let first = InputDocument::build(&[1], "a", true, true, "").unwrap();
        let path = first.write_to(&dir).unwrap();
        assert!(path.is_absolute());
        assert!(path.ends_with(DOCUMENT_FILE_NAME));

        let second = InputDocument::build(&[2], "b", false, false, "").unwrap();
        let again = second.write_to(&dir).unwrap();
        assert_eq!(path, again);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), second.render());
    }
}
