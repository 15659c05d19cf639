//! # Canonical Dates
//!
//! The circuit compares the user-supplied date against the certificate's
//! `UTCTime` validity bounds, so the date must arrive in ASN.1 `UTCTime`
//! shape: `YYMMDDhhmmssZ`.
//!
//! Canonical input passes through untouched. A plain calendar date is
//! pinned to 12:00:00 UTC. Anything unparsable is handed back unchanged;
//! canonicalization never fails.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Time of day used when only a calendar date is supplied.
pub const DEFAULT_TIME_OF_DAY: &str = "120000";

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%m/%d/%Y",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Whether `s` is already `YYMMDDhhmmssZ`.
pub fn is_canonical(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 13 && b[..12].iter().all(u8::is_ascii_digit) && b[12] == b'Z'
}

/// Normalize a user-supplied date.
///
/// Idempotent: `canonicalize(&canonicalize(d)) == canonicalize(d)`.
pub fn canonicalize(input: &str) -> String {
    if is_canonical(input) {
        return input.to_string();
    }
    match parse_calendar_date(input.trim()) {
        Some(date) => from_date(date),
        None => input.to_string(),
    }
}

/// Format a calendar date as `YYMMDD120000Z`.
pub fn from_date(date: NaiveDate) -> String {
    format!("{}{DEFAULT_TIME_OF_DAY}Z", date.format("%y%m%d"))
}

/// Parse a date in any of the accepted textual forms.
///
/// Date-times carrying an offset are converted to UTC before the date is
/// taken; naive date-times are read as UTC.
pub fn parse_calendar_date(s: &str) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        })
}
