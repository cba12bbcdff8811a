//! ZIP container handling and part resolution.
//!
//! An XLSX package is a ZIP archive of XML parts. Opening a package
//! locates the worksheet parts and the optional shared strings part,
//! parses the shared string table once, and keeps the archive handle
//! around so that sheets can be opened lazily.
//!
//! Parts are located by two strategies, tried in order:
//!
//! 1. `[Content_Types].xml` `<Override>` declarations, classified by
//!    content type.
//! 2. `xl/_rels/workbook.xml.rels` `<Relationship>` declarations,
//!    classified by relationship type, for producers that omit explicit
//!    overrides.

use crate::error::{Error, Result};
use crate::shared_strings::SharedStrings;
use crate::sheet::Sheet;
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;
use std::sync::Mutex;

const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";

const WORKSHEET_CONTENT_TYPE: &[u8] =
    b"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";
const SHARED_STRINGS_CONTENT_TYPE: &[u8] =
    b"application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml";

const WORKSHEET_REL_TYPE: &[u8] =
    b"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
const SHARED_STRINGS_REL_TYPE: &[u8] =
    b"http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings";

type Archive = zip::ZipArchive<Cursor<Vec<u8>>>;

/// Transient index of part paths, discarded after open.
#[derive(Debug, Default)]
struct PartIndex {
    shared_strings: Option<String>,
    worksheets: Vec<String>,
}

/// An open XLSX package.
///
/// Owns the archive handle, the shared string table, and the ordered
/// list of worksheet part paths. [`Sheet`] handles borrow the package
/// and cannot outlive it.
pub struct Package {
    archive: Mutex<Option<Archive>>,
    shared: SharedStrings,
    sheet_paths: Vec<String>,
}

impl Package {
    /// Open an XLSX package from a file path.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use xlsxstream::Package;
    ///
    /// let package = Package::open("data.xlsx")?;
    /// for sheet in package.sheets() {
    ///     let mut reader = sheet.open()?;
    ///     while reader.next() {
    ///         println!("{:?}", reader.row());
    ///     }
    /// }
    /// # Ok::<(), xlsxstream::Error>(())
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let mut reader = BufReader::new(file);
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(data)
    }

    /// Open an XLSX package from a byte vector.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let mut archive = zip::ZipArchive::new(Cursor::new(data))?;

        let index = build_part_index(&mut archive)?;

        // Bake the index conclusions into exact member names now, so a
        // declared part that does not exist fails the open, not some
        // later sheet read.
        let mut sheet_paths = Vec::with_capacity(index.worksheets.len());
        for part in &index.worksheets {
            sheet_paths.push(resolve_member(&archive, part)?);
        }

        let shared = match &index.shared_strings {
            Some(part) => {
                let member = resolve_member(&archive, part)?;
                let bytes = read_member_required(&mut archive, &member)?;
                SharedStrings::parse(&bytes[..])?
            }
            None => SharedStrings::default(),
        };

        Ok(Self {
            archive: Mutex::new(Some(archive)),
            shared,
            sheet_paths,
        })
    }

    /// Sheet handles in manifest declaration order.
    ///
    /// Creating a handle does no I/O; the worksheet part is only opened
    /// by [`Sheet::open`].
    pub fn sheets(&self) -> Vec<Sheet<'_>> {
        self.sheet_paths
            .iter()
            .map(|path| Sheet::new(self, path))
            .collect()
    }

    /// Number of worksheet parts in the package.
    pub fn sheet_count(&self) -> usize {
        self.sheet_paths.len()
    }

    /// The package-level shared string table.
    pub fn shared_strings(&self) -> &SharedStrings {
        &self.shared
    }

    /// Release the archive handle.
    ///
    /// Idempotent. Sheets opened from this package fail with
    /// [`Error::UseAfterClose`] afterwards; the shared string table
    /// stays readable.
    pub fn close(&self) {
        let mut guard = match self.archive.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.take();
    }

    /// Decompress one part into an owned buffer.
    pub(crate) fn read_part(&self, path: &str) -> Result<Vec<u8>> {
        let mut guard = match self.archive.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let archive = guard.as_mut().ok_or(Error::UseAfterClose)?;
        read_member_required(archive, path)
    }
}

impl std::fmt::Debug for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Package")
            .field("sheets", &self.sheet_paths)
            .field("shared_strings", &self.shared.len())
            .finish()
    }
}

/// Build the part index, preferring content type overrides and falling
/// back to workbook relationships.
fn build_part_index(archive: &mut Archive) -> Result<PartIndex> {
    let content_types = read_member(archive, CONTENT_TYPES_PART)?;

    let mut index = match &content_types {
        Some(bytes) => parse_content_types(bytes)?,
        None => PartIndex::default(),
    };

    if index.worksheets.is_empty() {
        match read_member(archive, WORKBOOK_RELS_PART)? {
            Some(bytes) => {
                let rels = parse_workbook_rels(&bytes)?;
                index.worksheets = rels.worksheets;
                if index.shared_strings.is_none() {
                    index.shared_strings = rels.shared_strings;
                }
            }
            None => {
                if content_types.is_none() {
                    return Err(Error::ManifestNotFound);
                }
            }
        }
    }

    if index.worksheets.is_empty() {
        return Err(Error::NoWorksheetsFound);
    }

    Ok(index)
}

/// Parse `[Content_Types].xml` override declarations.
fn parse_content_types(xml: &[u8]) -> Result<PartIndex> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut index = PartIndex::default();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Empty(ref e))
            | Ok(quick_xml::events::Event::Start(ref e)) => {
                if e.name().as_ref() != b"Override" {
                    buf.clear();
                    continue;
                }

                let mut part_name: Option<String> = None;
                let mut is_worksheet = false;
                let mut is_shared = false;

                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"PartName" => {
                            part_name = Some(String::from_utf8_lossy(&attr.value).to_string());
                        }
                        b"ContentType" => {
                            is_worksheet = attr.value.as_ref() == WORKSHEET_CONTENT_TYPE;
                            is_shared = attr.value.as_ref() == SHARED_STRINGS_CONTENT_TYPE;
                        }
                        _ => {}
                    }
                }

                if is_worksheet || is_shared {
                    let part_name = part_name.ok_or_else(|| {
                        Error::ManifestMalformed("Override missing PartName".to_string())
                    })?;
                    if is_worksheet {
                        index.worksheets.push(part_name);
                    } else {
                        index.shared_strings = Some(part_name);
                    }
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(Error::ManifestMalformed(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(index)
}

/// Parse `xl/_rels/workbook.xml.rels` relationship declarations.
fn parse_workbook_rels(xml: &[u8]) -> Result<PartIndex> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut index = PartIndex::default();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Empty(ref e))
            | Ok(quick_xml::events::Event::Start(ref e)) => {
                if e.name().as_ref() != b"Relationship" {
                    buf.clear();
                    continue;
                }

                let mut target: Option<String> = None;
                let mut is_worksheet = false;
                let mut is_shared = false;

                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"Target" => {
                            target = Some(String::from_utf8_lossy(&attr.value).to_string());
                        }
                        b"Type" => {
                            is_worksheet = attr.value.as_ref() == WORKSHEET_REL_TYPE;
                            is_shared = attr.value.as_ref() == SHARED_STRINGS_REL_TYPE;
                        }
                        _ => {}
                    }
                }

                if is_worksheet || is_shared {
                    let target = target.ok_or_else(|| {
                        Error::ManifestMalformed("Relationship missing Target".to_string())
                    })?;
                    if is_worksheet {
                        index.worksheets.push(target);
                    } else {
                        index.shared_strings = Some(target);
                    }
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(Error::ManifestMalformed(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(index)
}

/// Whether a declared part path refers to an archive member.
///
/// Absolute paths (leading `/`) are matched verbatim; relative paths
/// are matched as a contains match, since real-world producers emit
/// either form.
fn part_matches_member(part: &str, member: &str) -> bool {
    match part.strip_prefix('/') {
        Some(absolute) => absolute == member,
        None => member.contains(part),
    }
}

/// Resolve a declared part path to the exact archive member name.
fn resolve_member(archive: &Archive, part: &str) -> Result<String> {
    archive
        .file_names()
        .find(|member| part_matches_member(part, member))
        .map(str::to_string)
        .ok_or_else(|| Error::PartNotFound(part.to_string()))
}

/// Read a member by exact name, `None` when absent.
fn read_member(archive: &mut Archive, name: &str) -> Result<Option<Vec<u8>>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(Error::PartUnreadable(format!("{name}: {e}"))),
    };

    let mut data = Vec::new();
    file.read_to_end(&mut data)
        .map_err(|e| Error::PartUnreadable(format!("{name}: {e}")))?;
    Ok(Some(data))
}

/// Read a member by exact name, failing when absent.
fn read_member_required(archive: &mut Archive, name: &str) -> Result<Vec<u8>> {
    read_member(archive, name)?.ok_or_else(|| Error::PartNotFound(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_matches_member() {
        assert!(part_matches_member(
            "/xl/worksheets/sheet1.xml",
            "xl/worksheets/sheet1.xml"
        ));
        assert!(!part_matches_member(
            "/worksheets/sheet1.xml",
            "xl/worksheets/sheet1.xml"
        ));
        assert!(part_matches_member(
            "worksheets/sheet1.xml",
            "xl/worksheets/sheet1.xml"
        ));
        assert!(part_matches_member("sharedStrings.xml", "xl/sharedStrings.xml"));
        assert!(!part_matches_member("sheet2.xml", "xl/worksheets/sheet1.xml"));
    }

    #[test]
    fn test_parse_content_types() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
  <Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
  <Override PartName="/xl/worksheets/sheet2.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
  <Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>
</Types>"#;

        let index = parse_content_types(xml).unwrap();
        assert_eq!(
            index.worksheets,
            vec!["/xl/worksheets/sheet1.xml", "/xl/worksheets/sheet2.xml"]
        );
        assert_eq!(
            index.shared_strings.as_deref(),
            Some("/xl/sharedStrings.xml")
        );
    }

    #[test]
    fn test_parse_content_types_missing_part_name() {
        let xml = br#"<Types><Override ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

        let err = parse_content_types(xml).unwrap_err();
        assert!(matches!(err, Error::ManifestMalformed(_)));
    }

    #[test]
    fn test_parse_workbook_rels() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#;

        let index = parse_workbook_rels(xml).unwrap();
        assert_eq!(index.worksheets, vec!["worksheets/sheet1.xml"]);
        assert_eq!(index.shared_strings.as_deref(), Some("sharedStrings.xml"));
    }

    #[test]
    fn test_malformed_manifest() {
        let xml = br#"<Types><Override PartName="/a.xml"</Types>"#;

        let err = parse_content_types(xml).unwrap_err();
        assert!(matches!(err, Error::ManifestMalformed(_)));
    }
}
