//! Chunk records: the output unit of ingestion.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Content classification of a block or chunk.
///
/// Variants are declared in classification priority order; see [`ContentType::rank`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Ruled or aligned table
    Table,
    /// Vector drawing
    Figure,
    /// Raster image
    Bitmap,
    /// Term or abbreviation definition
    Definition,
    /// Register bit-field description
    Register,
    /// Plain running text
    Text,
}

impl ContentType {
    /// Every content type, highest priority first.
    pub const PRIORITY: [ContentType; 6] = [
        ContentType::Table,
        ContentType::Figure,
        ContentType::Bitmap,
        ContentType::Definition,
        ContentType::Register,
        ContentType::Text,
    ];

    /// Priority rank; 0 is the highest.
    pub fn rank(self) -> usize {
        match self {
            ContentType::Table => 0,
            ContentType::Figure => 1,
            ContentType::Bitmap => 2,
            ContentType::Definition => 3,
            ContentType::Register => 4,
            ContentType::Text => 5,
        }
    }

    /// Lowercase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Table => "table",
            ContentType::Figure => "figure",
            ContentType::Bitmap => "bitmap",
            ContentType::Definition => "definition",
            ContentType::Register => "register",
            ContentType::Text => "text",
        }
    }

    /// Whether blocks of this type feed the running text accumulator.
    pub fn is_running_text(self) -> bool {
        matches!(self, ContentType::Text | ContentType::Register)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One self-describing unit of extracted content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    /// Source file name, e.g. "JESD84-B51.pdf"
    pub source: String,
    /// Document revision, e.g. "5.1"
    pub version: String,
    pub page_start: u32,
    pub page_end: u32,
    /// Dotted numeric path, e.g. ["6", "6.10", "6.10.4"]
    pub section_path: Vec<String>,
    pub section_title: String,
    /// TOC depth of the section; 0 when no section applies
    pub heading_level: u8,
    pub content_type: ContentType,
    pub is_front_matter: bool,
    /// Ordinal within the chunker call that produced it
    pub chunk_index: usize,
    /// Context header line followed by the content
    pub text: String,
    /// Content without the header
    pub raw_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_markdown: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub figure_caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term: Option<String>,
    /// Id of the full-table chunk a row-group chunk belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_chunk_id: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_row_chunk: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Chunk {
    /// Serialize as one JSON line (no trailing newline).
    pub fn to_json_line(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
