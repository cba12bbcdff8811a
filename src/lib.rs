//! # xlsxstream
//!
//! Streaming row-by-row extraction from XLSX spreadsheets.
//!
//! An XLSX package is a ZIP archive of XML parts. This library locates
//! the worksheet parts and the shared string table inside the archive,
//! then decodes worksheet rows one at a time from a pull-based XML
//! cursor — no document model is ever built, and only one worksheet
//! part is resident at a time.
//!
//! ## Quick Start
//!
//! ```no_run
//! use xlsxstream::Package;
//!
//! let package = Package::open("data.xlsx")?;
//!
//! for sheet in package.sheets() {
//!     let mut reader = sheet.open()?;
//!     while reader.next() {
//!         println!("{:?}", reader.row());
//!     }
//!     if let Some(err) = reader.error() {
//!         eprintln!("decode failed: {err}");
//!     }
//!     reader.close();
//! }
//!
//! package.close();
//! # Ok::<(), xlsxstream::Error>(())
//! ```
//!
//! ## Reading style
//!
//! [`SheetReader::next`] / [`SheetReader::row`] / [`SheetReader::error`]
//! follow the CSV-reader idiom: `next()` returns `false` on both
//! exhaustion and failure, and `error()` tells them apart (`None` means
//! the sheet simply ended). [`SheetReader::read`] folds the three into
//! a single call for `Result`-oriented callers.
//!
//! Cell values arrive as strings: inline strings verbatim, shared
//! strings resolved through the package-level table, and numeric cells
//! re-rendered in shortest round-trip form (`"3.140000"` becomes
//! `"3.14"`). The [`convert`] module has helpers for turning those
//! strings into dates and integers.

pub mod container;
pub mod convert;
pub mod error;
pub mod shared_strings;
pub mod sheet;

// Re-exports
pub use container::Package;
pub use error::{Error, Result};
pub use shared_strings::SharedStrings;
pub use sheet::{Sheet, SheetReader};

use std::path::Path;

/// Open an XLSX package from a file path.
///
/// Convenience for [`Package::open`].
///
/// # Example
///
/// ```no_run
/// let package = xlsxstream::open("data.xlsx")?;
/// println!("sheets: {}", package.sheet_count());
/// # Ok::<(), xlsxstream::Error>(())
/// ```
pub fn open(path: impl AsRef<Path>) -> Result<Package> {
    Package::open(path)
}

/// Open an XLSX package from a byte vector.
///
/// Convenience for [`Package::from_bytes`].
pub fn from_bytes(data: Vec<u8>) -> Result<Package> {
    Package::from_bytes(data)
}
