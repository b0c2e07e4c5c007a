//! Input detection: PDF magic check and revision marker parsing.

use crate::error::{Error, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Version string used when the filename carries no revision marker.
pub const UNKNOWN_VERSION: &str = "unknown";

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";
const PDF_MAGIC_LEN: usize = 5;
const VERSION_LEN: usize = 3; // e.g., "1.7"

lazy_static! {
    /// Revision marker such as `B51` (5.1) or `B451` (4.51) in a filename segment.
    static ref REVISION_MARKER: Regex = Regex::new(r"(?i)(?:^|[^a-z])b(\d)(\d+)").unwrap();
}

/// Check a file's header and return the declared PDF version (e.g. "1.7").
///
/// # Example
/// ```no_run
/// use specchunk::detect::detect_format_from_path;
///
/// let version = detect_format_from_path("JESD84-B51.pdf").unwrap();
/// println!("PDF version: {}", version);
/// ```
pub fn detect_format_from_path<P: AsRef<Path>>(path: P) -> Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut header = [0u8; 16];
    let read = reader.read(&mut header)?;
    detect_format_from_bytes(&header[..read])
}

/// Check a byte prefix for the PDF header and return the declared version.
pub fn detect_format_from_bytes(data: &[u8]) -> Result<String> {
    if data.len() < PDF_MAGIC_LEN + VERSION_LEN || !data.starts_with(PDF_MAGIC) {
        return Err(Error::UnknownFormat);
    }

    let version_bytes = &data[PDF_MAGIC_LEN..PDF_MAGIC_LEN + VERSION_LEN];
    let version = String::from_utf8_lossy(version_bytes).to_string();

    let bytes = version.as_bytes();
    let well_formed = bytes.len() == 3
        && bytes[0].is_ascii_digit()
        && bytes[1] == b'.'
        && bytes[2].is_ascii_digit();
    if !well_formed {
        return Err(Error::UnsupportedVersion(version));
    }

    Ok(version)
}

/// Check if a file is a PDF.
pub fn is_pdf<P: AsRef<Path>>(path: P) -> bool {
    detect_format_from_path(path).is_ok()
}

/// Derive the document revision from a filename.
///
/// The first `B<major><minor>` segment wins: `JESD84-B51.pdf` yields `"5.1"`,
/// `JESD84-B451.pdf` yields `"4.51"`. Anything else yields [`UNKNOWN_VERSION`].
pub fn version_from_filename(name: &str) -> String {
    REVISION_MARKER
        .captures(name)
        .map(|caps| format!("{}.{}", &caps[1], &caps[2]))
        .unwrap_or_else(|| UNKNOWN_VERSION.to_string())
}

/// The source identifier recorded on every chunk: the file name of `path`.
pub fn source_name<P: AsRef<Path>>(path: P) -> String {
    path.as_ref()
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.as_ref().display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_valid_pdf() {
        let data = b"%PDF-1.7\n%\xe2\xe3\xcf\xd3";
        assert_eq!(detect_format_from_bytes(data).unwrap(), "1.7");
    }

    #[test]
    fn test_detect_invalid_format() {
        let result = detect_format_from_bytes(b"<!DOCTYPE html>");
        assert!(matches!(result, Err(Error::UnknownFormat)));
    }

    #[test]
    fn test_detect_too_short() {
        let result = detect_format_from_bytes(b"%PDF");
        assert!(matches!(result, Err(Error::UnknownFormat)));
    }

    #[test]
    fn test_detect_malformed_version() {
        let result = detect_format_from_bytes(b"%PDF-x.y\n");
        assert!(matches!(result, Err(Error::UnsupportedVersion(_))));
    }

    #[test]
    fn test_version_from_filename() {
        assert_eq!(version_from_filename("JESD84-B51.pdf"), "5.1");
        assert_eq!(version_from_filename("JESD84-B451.pdf"), "4.51");
        assert_eq!(version_from_filename("jesd84-b50_final.pdf"), "5.0");
        assert_eq!(version_from_filename("datasheet.pdf"), "unknown");
        // "b" inside a word is not a revision marker
        assert_eq!(version_from_filename("lab12.pdf"), "unknown");
    }

    #[test]
    fn test_source_name() {
        assert_eq!(source_name("docs/protocol/JESD84-B51.pdf"), "JESD84-B51.pdf");
    }
}
