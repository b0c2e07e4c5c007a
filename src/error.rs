//! Error types for specchunk.

use std::io;
use thiserror::Error;

/// Result type alias for specchunk operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during ingestion.
///
/// Only file-level problems surface through this type. Page-level extraction
/// failures are degraded inside the page extractor and quality rejections are
/// silent drops.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading the input or writing the output.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file format is not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF version is not supported.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The PDF document is encrypted.
    #[error("Document is encrypted")]
    Encrypted,

    /// Page number is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(u32, u32),

    /// A page content stream could not be interpreted.
    #[error("Content stream error: {0}")]
    ContentStream(String),

    /// A configured regular expression failed to compile.
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// Chunk serialization failed.
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialize(err.to_string())
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::InvalidPattern(err.to_string())
    }
}
