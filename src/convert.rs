//! Scalar conversion helpers for cell values.
//!
//! Pure functions for callers that need typed values out of the string
//! cells the reader produces. The extraction core never calls these.

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDateTime};

/// Days between the spreadsheet epoch (1899-12-30) and the Unix epoch.
const UNIX_EPOCH_SERIAL: f64 = 25569.0;

/// Convert a spreadsheet serial date to a calendar date.
///
/// `None` for serials that fall outside the representable range.
///
/// ```
/// use xlsxstream::convert::to_date;
///
/// let d = to_date(43889.0).unwrap();
/// assert_eq!(d.format("%Y-%m-%d").to_string(), "2020-02-28");
/// ```
pub fn to_date(serial: f64) -> Option<NaiveDateTime> {
    let secs = (serial - UNIX_EPOCH_SERIAL) * 86400.0;
    DateTime::from_timestamp(secs as i64, 0).map(|dt| dt.naive_utc())
}

/// Parse a numeric cell string and convert it to a calendar date.
pub fn str_to_date(s: &str) -> Result<NaiveDateTime> {
    let serial: f64 = s
        .parse()
        .map_err(|_| Error::InvalidData(format!("not a numeric date: {s:?}")))?;
    to_date(serial).ok_or_else(|| Error::InvalidData(format!("date out of range: {s:?}")))
}

/// Parse a cell string as a signed integer.
pub fn str_to_i64(s: &str) -> Result<i64> {
    s.parse()
        .map_err(|_| Error::InvalidData(format!("not an integer: {s:?}")))
}

/// Parse a cell string as an unsigned integer.
pub fn str_to_u64(s: &str) -> Result<u64> {
    s.parse()
        .map_err(|_| Error::InvalidData(format!("not an unsigned integer: {s:?}")))
}

/// Lenient variant of [`str_to_i64`]: unparseable input yields 0.
pub fn str_to_i64_or_zero(s: &str) -> i64 {
    s.parse().unwrap_or(0)
}

/// Lenient variant of [`str_to_u64`]: unparseable input yields 0.
pub fn str_to_u64_or_zero(s: &str) -> u64 {
    s.parse().unwrap_or(0)
}
