//! Post-filter: chunk validity and the searchable view.

use lazy_static::lazy_static;
use regex::Regex;

use crate::model::{Chunk, ContentType};

use super::IngestOptions;

lazy_static! {
    static ref NOISE_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)^(cont'd|continued|continued\s+on\s+next\s+page|to\s+be\s+continued)\.?$").unwrap(),
        Regex::new(r"(?i)^(downloaded\s+by|ruyi|JEDEC\s+Standard).*$").unwrap(),
    ];
}

/// Minimum trimmed `raw_text` length of a row-group chunk.
pub const MIN_ROW_CHUNK_CHARS: usize = 25;

/// Minimum trimmed `raw_text` length of a chunk of `content_type`.
pub fn min_raw_chars(content_type: ContentType) -> usize {
    match content_type {
        ContentType::Text => 20,
        ContentType::Table => 80,
        ContentType::Figure => 30,
        ContentType::Bitmap => 30,
        ContentType::Definition => 8,
        ContentType::Register => 40,
    }
}

/// Whether the content is a bare continuation marker or stamp leftover.
pub fn is_noise(content: &str) -> bool {
    NOISE_PATTERNS.iter().any(|p| p.is_match(content))
}

/// Whether a chunk carries enough meaningful content.
pub fn is_valid_chunk(chunk: &Chunk) -> bool {
    let content = chunk.raw_text.trim();
    let min_chars = if chunk.is_row_chunk {
        MIN_ROW_CHUNK_CHARS
    } else {
        min_raw_chars(chunk.content_type)
    };
    content.chars().count() >= min_chars && !is_noise(content)
}

/// Whether a chunk belongs to the searchable view.
///
/// Front matter is excluded, as are full-table chunks outside register map
/// sections (their row groups are searched instead) and invalid chunks.
pub fn is_searchable(chunk: &Chunk, options: &IngestOptions) -> bool {
    if chunk.is_front_matter {
        return false;
    }
    if chunk.content_type == ContentType::Table
        && !chunk.is_row_chunk
        && !options.is_register_map_section(&chunk.section_title)
    {
        return false;
    }
    is_valid_chunk(chunk)
}
