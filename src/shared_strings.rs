//! Shared string table parsing.
//!
//! XLSX stores every repeated cell text once in `xl/sharedStrings.xml`
//! and references it by position from `t="s"` cells. The table is built
//! once when the package is opened and never mutated afterwards, so any
//! number of sheet readers can resolve against it concurrently.

use crate::error::{is_unclosed_eof, Error, Result};
use std::io::BufRead;

/// Ordered, 0-indexed shared string table.
#[derive(Debug, Clone, Default)]
pub struct SharedStrings {
    strings: Vec<String>,
}

impl SharedStrings {
    /// Parse the shared strings part from a byte stream.
    ///
    /// Producers legitimately emit self-closing `<t/>` entries; each one
    /// occupies its own slot so that later numeric indices stay aligned.
    /// The `count`/`uniqueCount` attributes are informational only and
    /// are never trusted for sizing.
    pub fn parse<R: BufRead>(reader: R) -> Result<Self> {
        let mut xml = quick_xml::Reader::from_reader(reader);

        let mut strings = Vec::new();
        let mut buf = Vec::new();
        // Entry text is taken verbatim, so text trimming stays off and
        // the in-text flag is dropped on every element boundary.
        let mut in_text = false;

        loop {
            match xml.read_event_into(&mut buf) {
                Ok(quick_xml::events::Event::Start(ref e)) => {
                    in_text = e.name().as_ref() == b"t";
                }
                Ok(quick_xml::events::Event::Empty(ref e)) => {
                    if e.name().as_ref() == b"t" {
                        strings.push(String::new());
                    }
                    in_text = false;
                }
                Ok(quick_xml::events::Event::Text(ref e)) => {
                    if in_text {
                        let text = e
                            .unescape()
                            .map_err(|err| Error::SharedStringsCorrupt(err.to_string()))?;
                        strings.push(text.into_owned());
                    }
                }
                Ok(quick_xml::events::Event::End(ref e)) => {
                    if e.name().as_ref() == b"sst" {
                        break;
                    }
                    in_text = false;
                }
                Ok(quick_xml::events::Event::Eof) => break,
                Err(ref e) if is_unclosed_eof(e) => break,
                Err(e) => return Err(Error::SharedStringsCorrupt(e.to_string())),
                _ => {}
            }
            buf.clear();
        }

        Ok(Self { strings })
    }

    /// Get a string by index, `None` when out of range.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.strings.get(index).map(|s| s.as_str())
    }

    /// Number of entries in the table.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}
