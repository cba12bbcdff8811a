//! Error types for the xlsxstream library.

use std::io;
use thiserror::Error;

/// Result type alias for xlsxstream operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while opening a package or decoding rows.
///
/// Structural failures during [`Package::open`](crate::Package::open)
/// (manifest, shared strings) abort the whole open; there is no partial
/// package. A decode failure aborts only the reader it occurred on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(String),

    /// Error reading the ZIP archive itself.
    #[error("ZIP archive error: {0}")]
    ZipArchive(String),

    /// Neither `[Content_Types].xml` nor the workbook relationships
    /// part exists in the package.
    #[error("no content types or relationships manifest in package")]
    ManifestNotFound,

    /// The manifest part exists but is not structurally valid XML.
    #[error("malformed manifest: {0}")]
    ManifestMalformed(String),

    /// Both resolution strategies produced zero worksheet parts.
    #[error("no worksheet parts declared in package")]
    NoWorksheetsFound,

    /// A declared part path has no matching archive member.
    #[error("part not found: {0}")]
    PartNotFound(String),

    /// An archive member exists but could not be read.
    #[error("part unreadable: {0}")]
    PartUnreadable(String),

    /// The shared strings part is not structurally valid XML.
    #[error("shared strings corrupt: {0}")]
    SharedStringsCorrupt(String),

    /// A `shared`-typed cell referenced an index past the end of the
    /// shared string table.
    #[error("shared string index {index} out of range (table has {len} entries)")]
    SharedIndexOutOfRange {
        /// The index the cell declared.
        index: usize,
        /// Number of entries in the table.
        len: usize,
    },

    /// The worksheet part ended before a `<sheetData>` element was seen.
    #[error("row container <sheetData> not found in worksheet part")]
    RowContainerNotFound,

    /// The worksheet part ended before the current row's closing tag.
    #[error("worksheet part truncated mid-row")]
    TruncatedRow,

    /// An element appeared where a cell was expected inside a row.
    #[error("unexpected element <{0}> while decoding row")]
    UnexpectedElement(String),

    /// The reader or package was used after `close()`.
    #[error("use after close")]
    UseAfterClose,

    /// Error from the XML tokenizer outside the manifest.
    #[error("XML parse error: {0}")]
    XmlParse(String),

    /// Invalid or malformed data in a cell value.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::ZipArchive(err.to_string())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::XmlParse(err.to_string())
    }
}

/// Whether a tokenizer error means the input simply ended with tags
/// still open, as opposed to structurally bad XML.
pub(crate) fn is_unclosed_eof(err: &quick_xml::Error) -> bool {
    matches!(
        err,
        quick_xml::Error::IllFormed(quick_xml::errors::IllFormedError::MissingEndTag(_))
    )
}
