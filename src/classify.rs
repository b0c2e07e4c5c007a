//! Block classification by fixed content-type priority.

use lazy_static::lazy_static;
use regex::Regex;

use crate::chunk::is_definition_section_title;
use crate::model::{BBox, ContentType, DrawingCluster, ImageBlock, PageModel, RawTable, SectionNode, TextSpan};

lazy_static! {
    static ref BIT_RANGE: Regex = Regex::new(r"\[\d+(?::\d+)?\]").unwrap();
    static ref REGISTER_FIELD: Regex = Regex::new(
        r"(?i)(?:\br/w/e_p\b|\br/w/c_p\b|\br/wp?\b|\botp\b|\breserved\b|\bread/write\b|\bread only\b|\bwrite once\b)"
    )
    .unwrap();
}

/// Tolerance when testing whether a text block sits inside a table.
const TABLE_PADDING: f32 = 2.0;

/// A geometric block of a page.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Table(RawTable),
    Drawing(DrawingCluster),
    Image(ImageBlock),
    Span(TextSpan),
}

impl Block {
    pub fn bbox(&self) -> BBox {
        match self {
            Block::Table(t) => t.bbox,
            Block::Drawing(d) => d.bbox,
            Block::Image(i) => i.bbox,
            Block::Span(s) => s.bbox,
        }
    }

    /// Text of a span block.
    pub fn text(&self) -> Option<&str> {
        match self {
            Block::Span(s) => Some(&s.text),
            _ => None,
        }
    }
}

/// A block with its assigned content type.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedBlock {
    pub content_type: ContentType,
    pub block: Block,
}

/// Whether text reads like a register bit-field description.
pub fn is_register_text(text: &str) -> bool {
    BIT_RANGE.is_match(text) && REGISTER_FIELD.is_match(text)
}

/// Assigns each block of a page exactly one content type.
///
/// Types are claimed in [`ContentType::PRIORITY`] order regardless of the
/// order blocks arrive in: tables first, then drawings outside tables, then
/// images, then text. Text whose center falls in a table is a duplicate of
/// the table's cells and is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockClassifier;

impl BlockClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify a page's blocks, ordered top to bottom.
    pub fn classify(&self, page: &PageModel, section: Option<&SectionNode>) -> Vec<ClassifiedBlock> {
        let definition_section = section.map(|s| is_definition_section_title(&s.title)).unwrap_or(false);
        let mut out: Vec<ClassifiedBlock> = Vec::new();
        let mut claimed: Vec<BBox> = Vec::new();

        for content_type in ContentType::PRIORITY {
            match content_type {
                ContentType::Table => {
                    for table in &page.tables {
                        claimed.push(table.bbox);
                        out.push(ClassifiedBlock {
                            content_type,
                            block: Block::Table(table.clone()),
                        });
                    }
                }
                ContentType::Figure => {
                    for cluster in &page.drawing_clusters {
                        // Table rulings, not a figure
                        if claimed.iter().any(|t| t.contains_center_of(&cluster.bbox, 0.0)) {
                            continue;
                        }
                        out.push(ClassifiedBlock {
                            content_type,
                            block: Block::Drawing(cluster.clone()),
                        });
                    }
                }
                ContentType::Bitmap => {
                    for image in &page.images {
                        out.push(ClassifiedBlock {
                            content_type,
                            block: Block::Image(image.clone()),
                        });
                    }
                }
                // Text blocks are claimed once, by their most specific type
                ContentType::Definition | ContentType::Register => {}
                ContentType::Text => {
                    for span in &page.text_spans {
                        if claimed
                            .iter()
                            .any(|t| t.contains_center_of(&span.bbox, TABLE_PADDING))
                        {
                            continue;
                        }
                        out.push(ClassifiedBlock {
                            content_type: self.text_type(span, definition_section),
                            block: Block::Span(span.clone()),
                        });
                    }
                }
            }
        }

        // Stable: equal tops keep priority order
        out.sort_by(|a, b| {
            a.block
                .bbox()
                .top
                .partial_cmp(&b.block.bbox().top)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        out
    }

    fn text_type(&self, span: &TextSpan, definition_section: bool) -> ContentType {
        if definition_section {
            ContentType::Definition
        } else if is_register_text(&span.text) {
            ContentType::Register
        } else {
            ContentType::Text
        }
    }
}
