//! Sheet handles and the streaming row decoder.
//!
//! A [`Sheet`] is a lazily-opened reference to one worksheet part;
//! creating it does no I/O. [`Sheet::open`] decompresses the part and
//! returns a [`SheetReader`], a single-pass cursor that decodes one
//! `<row>` per [`SheetReader::next`] call, resolving each cell against
//! the package-level shared string table.
//!
//! A worksheet part looks like:
//!
//! ```xml
//! <worksheet>
//!   <sheetData>
//!     <row r="1">
//!       <c r="A1" t="inlineStr"><is><t>Date</t></is></c>
//!       <c r="B1"><v>41.5</v></c>
//!     </row>
//!   </sheetData>
//! </worksheet>
//! ```

use crate::container::Package;
use crate::error::{is_unclosed_eof, Error, Result};
use crate::shared_strings::SharedStrings;
use std::io::{BufRead, Cursor};

/// A lightweight handle to one worksheet part.
///
/// Borrows the owning [`Package`]; the borrow checker guarantees the
/// package outlives every handle it produced.
#[derive(Debug, Clone, Copy)]
pub struct Sheet<'p> {
    package: &'p Package,
    path: &'p str,
}

impl<'p> Sheet<'p> {
    pub(crate) fn new(package: &'p Package, path: &'p str) -> Self {
        Self { package, path }
    }

    /// The archive member name of this worksheet part.
    pub fn part_path(&self) -> &'p str {
        self.path
    }

    /// Open the worksheet part for row-by-row reading.
    ///
    /// This is the only fallible step on a handle: the part bytes are
    /// decompressed here, and the returned reader is already positioned
    /// past the worksheet preamble at the row container.
    pub fn open(&self) -> Result<SheetReader<'p>> {
        let data = self.package.read_part(self.path)?;
        SheetReader::from_reader(Cursor::new(data), self.package.shared_strings())
    }
}

/// Declared cell type, from the `t=` attribute of `<c>`.
#[derive(Debug, Clone, Copy, PartialEq)]
enum CellKind {
    /// No type attribute, or a type resolved from the raw value text
    /// (numeric, formula string, boolean, error).
    Plain,
    /// `t="s"`: the value is an index into the shared string table.
    Shared,
    /// `t="inlineStr"`: the value is literal text nested in `<is>`.
    Inline,
}

impl CellKind {
    fn from_attr(value: &[u8]) -> Self {
        match value {
            b"s" => CellKind::Shared,
            b"inlineStr" => CellKind::Inline,
            _ => CellKind::Plain,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Positioned,
    HasRow,
    Exhausted,
    Failed,
    Closed,
}

/// Streaming, single-pass row decoder for one worksheet part.
///
/// Pull-based: every [`next`](Self::next) call blocks until a full row
/// is decoded, the part is exhausted, or an error occurs. The reader
/// owns its cursor and row buffer exclusively and must not be shared
/// across threads; readers for different sheets of the same package are
/// independent.
///
/// ```no_run
/// # let package = xlsxstream::Package::open("data.xlsx")?;
/// let sheet = package.sheets()[0];
/// let mut reader = sheet.open()?;
/// while reader.next() {
///     println!("{:?}", reader.row());
/// }
/// if let Some(err) = reader.error() {
///     eprintln!("decode failed: {err}");
/// }
/// reader.close();
/// # Ok::<(), xlsxstream::Error>(())
/// ```
pub struct SheetReader<'p, R: BufRead = Cursor<Vec<u8>>> {
    xml: Option<quick_xml::Reader<R>>,
    shared: &'p SharedStrings,
    row: Vec<String>,
    buf: Vec<u8>,
    err: Option<Error>,
    state: State,
    reuse_rows: bool,
}

impl<'p, R: BufRead> SheetReader<'p, R> {
    /// Create a reader over a raw worksheet XML byte stream.
    ///
    /// Skips the worksheet preamble up to the opening `<sheetData>`
    /// tag; fails with [`Error::RowContainerNotFound`] if the stream
    /// ends first. A self-closing `<sheetData/>` yields a reader that
    /// is already exhausted.
    pub fn from_reader(reader: R, shared: &'p SharedStrings) -> Result<Self> {
        let mut xml = quick_xml::Reader::from_reader(reader);
        let mut buf = Vec::new();

        let state = loop {
            match xml.read_event_into(&mut buf) {
                Ok(quick_xml::events::Event::Start(ref e))
                    if e.name().as_ref() == b"sheetData" =>
                {
                    break State::Positioned;
                }
                Ok(quick_xml::events::Event::Empty(ref e))
                    if e.name().as_ref() == b"sheetData" =>
                {
                    break State::Exhausted;
                }
                Ok(quick_xml::events::Event::Eof) => return Err(Error::RowContainerNotFound),
                Ok(_) => {}
                Err(ref e) if is_unclosed_eof(e) => return Err(Error::RowContainerNotFound),
                Err(e) => return Err(Error::XmlParse(e.to_string())),
            }
            buf.clear();
        };
        buf.clear();

        Ok(Self {
            xml: Some(xml),
            shared,
            row: Vec::new(),
            buf,
            err: None,
            state,
            reuse_rows: false,
        })
    }

    /// Opt into reusing the row buffer's backing storage across calls.
    ///
    /// With reuse enabled the slice returned by [`row`](Self::row) is
    /// overwritten by the next [`next`](Self::next) call; callers that
    /// need to retain a row past the next advance must copy it. The
    /// default allocates fresh storage per row.
    pub fn set_reuse_rows(&mut self, reuse: bool) {
        self.reuse_rows = reuse;
    }

    /// Advance to the next row.
    ///
    /// Returns `true` when a row was decoded. `false` means either
    /// exhaustion or failure; check [`error`](Self::error) to tell them
    /// apart. After a failure, every later call returns `false` and the
    /// stored error stays reported. After [`close`](Self::close), the
    /// error is [`Error::UseAfterClose`].
    pub fn next(&mut self) -> bool {
        match self.state {
            State::Closed => {
                self.err = Some(Error::UseAfterClose);
                return false;
            }
            State::Failed | State::Exhausted => return false,
            State::Positioned | State::HasRow => {}
        }

        if self.reuse_rows {
            self.row.clear();
        } else {
            self.row = Vec::new();
        }

        enum Found {
            Row,
            EmptyRow,
            End,
            Skip,
        }

        loop {
            let found = {
                let Some(xml) = self.xml.as_mut() else {
                    self.err = Some(Error::UseAfterClose);
                    self.state = State::Closed;
                    return false;
                };
                self.buf.clear();
                match xml.read_event_into(&mut self.buf) {
                    Ok(quick_xml::events::Event::Start(ref e))
                        if e.name().as_ref() == b"row" =>
                    {
                        Found::Row
                    }
                    Ok(quick_xml::events::Event::Empty(ref e))
                        if e.name().as_ref() == b"row" =>
                    {
                        Found::EmptyRow
                    }
                    Ok(quick_xml::events::Event::End(ref e))
                        if e.name().as_ref() == b"sheetData" =>
                    {
                        Found::End
                    }
                    // A stream that simply stops between rows is treated
                    // as exhausted, not truncated.
                    Ok(quick_xml::events::Event::Eof) => Found::End,
                    Ok(_) => Found::Skip,
                    Err(ref e) if is_unclosed_eof(e) => Found::End,
                    Err(e) => {
                        self.err = Some(Error::XmlParse(e.to_string()));
                        self.state = State::Failed;
                        return false;
                    }
                }
            };

            match found {
                Found::Row => {
                    return match self.decode_row() {
                        Ok(()) => {
                            self.state = State::HasRow;
                            true
                        }
                        Err(e) => {
                            self.err = Some(e);
                            self.state = State::Failed;
                            false
                        }
                    };
                }
                Found::EmptyRow => {
                    self.state = State::HasRow;
                    return true;
                }
                Found::End => {
                    self.state = State::Exhausted;
                    return false;
                }
                Found::Skip => {}
            }
        }
    }

    /// Decode one row, cursor positioned just past its opening tag.
    fn decode_row(&mut self) -> Result<()> {
        let shared = self.shared;
        let Some(xml) = self.xml.as_mut() else {
            return Err(Error::UseAfterClose);
        };

        let mut kind = CellKind::Plain;
        let mut in_inline = false;
        let mut in_value = false;
        let mut has_cell = false;

        loop {
            self.buf.clear();
            match xml.read_event_into(&mut self.buf) {
                Ok(quick_xml::events::Event::Start(ref e)) => match e.name().as_ref() {
                    b"c" => {
                        kind = CellKind::Plain;
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"t" {
                                kind = CellKind::from_attr(attr.value.as_ref());
                            }
                        }
                        self.row.push(String::new());
                        has_cell = true;
                        in_inline = false;
                        in_value = false;
                    }
                    b"is" => in_inline = true,
                    b"t" | b"v" => in_value = true,
                    other => {
                        return Err(Error::UnexpectedElement(
                            String::from_utf8_lossy(other).to_string(),
                        ));
                    }
                },
                Ok(quick_xml::events::Event::Empty(ref e)) => match e.name().as_ref() {
                    // A self-closing cell carries no value at all; it
                    // occupies its position as an empty string.
                    b"c" => self.row.push(String::new()),
                    b"is" | b"t" | b"v" => {}
                    other => {
                        return Err(Error::UnexpectedElement(
                            String::from_utf8_lossy(other).to_string(),
                        ));
                    }
                },
                Ok(quick_xml::events::Event::Text(ref e)) => {
                    if in_value && has_cell {
                        let text = e
                            .unescape()
                            .map_err(|err| Error::XmlParse(err.to_string()))?;
                        if let Some(slot) = self.row.last_mut() {
                            slot.push_str(&text);
                        }
                    }
                }
                Ok(quick_xml::events::Event::End(ref e)) => match e.name().as_ref() {
                    b"c" => {
                        if !has_cell {
                            return Err(Error::UnexpectedElement("c".to_string()));
                        }
                        if let Some(slot) = self.row.last_mut() {
                            resolve_cell(slot, kind, in_inline, shared)?;
                        }
                        kind = CellKind::Plain;
                        in_inline = false;
                        in_value = false;
                        has_cell = false;
                    }
                    b"t" | b"v" => in_value = false,
                    b"row" => return Ok(()),
                    _ => {}
                },
                Ok(quick_xml::events::Event::Eof) => return Err(Error::TruncatedRow),
                Ok(_) => {}
                Err(ref e) if is_unclosed_eof(e) => return Err(Error::TruncatedRow),
                Err(e) => return Err(Error::XmlParse(e.to_string())),
            }
        }
    }

    /// The last decoded row.
    ///
    /// Cells appear in encounter order; declared column gaps are not
    /// filled, so a row declaring columns A and C yields two cells.
    /// The slice is valid until the next [`next`](Self::next) or
    /// [`close`](Self::close) call.
    pub fn row(&self) -> &[String] {
        &self.row
    }

    /// The stored error, excluding the exhaustion signal.
    ///
    /// `None` after exhaustion: a `false` from [`next`](Self::next)
    /// with no error here means the sheet simply ended.
    pub fn error(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    /// Advance and return the next row in one call.
    ///
    /// `Ok(None)` signals exhaustion; any stored decode error is
    /// returned as `Err`.
    pub fn read(&mut self) -> Result<Option<&[String]>> {
        if self.next() {
            return Ok(Some(&self.row));
        }
        match &self.err {
            Some(e) => Err(e.clone()),
            None => Ok(None),
        }
    }

    /// Release the part's byte stream.
    ///
    /// Safe to call in any state and idempotent. Later
    /// [`next`](Self::next) calls report [`Error::UseAfterClose`].
    pub fn close(&mut self) {
        self.xml = None;
        self.state = State::Closed;
    }
}

impl<'p, R: BufRead> std::fmt::Debug for SheetReader<'p, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetReader")
            .field("state", &self.state)
            .field("cells", &self.row.len())
            .finish()
    }
}

/// Resolve a decoded cell's stored representation into its final text.
fn resolve_cell(
    slot: &mut String,
    kind: CellKind,
    in_inline: bool,
    shared: &SharedStrings,
) -> Result<()> {
    if in_inline || kind == CellKind::Inline {
        // Inline string text was captured verbatim.
        return Ok(());
    }

    if kind == CellKind::Shared {
        let index: usize = slot.parse().map_err(|_| {
            Error::InvalidData(format!("invalid shared string index {slot:?}"))
        })?;
        return match shared.get(index) {
            Some(text) => {
                *slot = text.to_string();
                Ok(())
            }
            None => Err(Error::SharedIndexOutOfRange {
                index,
                len: shared.len(),
            }),
        };
    }

    // Numeric or untyped: re-render through shortest round-trip float
    // formatting; non-numeric text passes through unchanged since
    // producers occasionally mis-tag text cells.
    if let Ok(f) = slot.parse::<f64>() {
        *slot = f.to_string();
    }
    Ok(())
}
