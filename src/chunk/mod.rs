//! Type-specific chunkers and the helpers they share.
//!
//! Every chunk carries a one-line context header,
//! `[<product> <version> | <section label> | Page <n>]`, ahead of its content so
//! that it stays self-describing once separated from the document.

mod definition;
mod figure;
mod ids;
mod table;
mod text;

pub use definition::{is_definition_section_title, DefinitionChunker, SeenTerms};
pub use figure::FigureChunker;
pub use ids::{ChunkIds, IdScheme};
pub use table::{find_table_caption, preprocess_table, rows_to_markdown, PreparedTable, TableChunker};
pub use text::{TextChunker, TextSplitter};

use crate::model::{Chunk, ContentType, SectionNode};

/// Label used in headers when no section applies.
pub const FRONT_MATTER_LABEL: &str = "(front matter)";

/// Document-level values every chunker stamps onto its chunks.
#[derive(Debug, Clone, Copy)]
pub struct ChunkContext<'a> {
    pub source: &'a str,
    pub version: &'a str,
    /// Product name shown ahead of the version in headers, e.g. "eMMC"
    pub product: Option<&'a str>,
}

impl<'a> ChunkContext<'a> {
    pub fn new(source: &'a str, version: &'a str) -> Self {
        Self {
            source,
            version,
            product: None,
        }
    }

    pub fn with_product(mut self, product: Option<&'a str>) -> Self {
        self.product = product;
        self
    }

    /// The bracketed header line (without newline).
    pub fn header(&self, section: Option<&SectionNode>, page: u32) -> String {
        let label = section
            .map(|s| s.label())
            .unwrap_or_else(|| FRONT_MATTER_LABEL.to_string());
        match self.product {
            Some(product) => format!("[{} {} | {} | Page {}]", product, self.version, label, page),
            None => format!("[{} | {} | Page {}]", self.version, label, page),
        }
    }

    /// A chunk with the section fields filled in and no type-specific extras.
    ///
    /// `text` is `prefix` followed by `raw_text`.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn chunk(
        &self,
        ids: &mut ChunkIds,
        section: Option<&SectionNode>,
        content_type: ContentType,
        page_start: u32,
        page_end: u32,
        chunk_index: usize,
        prefix: &str,
        raw_text: String,
    ) -> Chunk {
        Chunk {
            chunk_id: ids.next_id(),
            source: self.source.to_string(),
            version: self.version.to_string(),
            page_start,
            page_end,
            section_path: section.map(|s| s.path.clone()).unwrap_or_default(),
            section_title: section.map(|s| s.title.clone()).unwrap_or_default(),
            heading_level: section.map(|s| s.level).unwrap_or(0),
            content_type,
            is_front_matter: section.map(|s| s.is_front_matter).unwrap_or(true),
            chunk_index,
            text: format!("{}{}", prefix, raw_text),
            raw_text,
            table_markdown: None,
            figure_caption: None,
            term: None,
            parent_chunk_id: None,
            is_row_chunk: false,
        }
    }
}
