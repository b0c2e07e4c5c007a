//! Page-level types produced by the page extractor.

use serde::{Deserialize, Serialize};

use super::BBox;

/// A page after extraction: text, drawings, images and raw tables.
///
/// Built once per page and not modified afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageModel {
    /// Page number (1-indexed)
    pub page_num: u32,

    /// Page width in points
    pub width: f32,

    /// Page height in points
    pub height: f32,

    /// Cleaned text blocks in extraction order
    pub text_spans: Vec<TextSpan>,

    /// Merged vector drawing regions
    pub drawing_clusters: Vec<DrawingCluster>,

    /// Raster image placements
    pub images: Vec<ImageBlock>,

    /// Table grids as extracted
    pub tables: Vec<RawTable>,
}

impl PageModel {
    /// Create an empty page model.
    pub fn new(page_num: u32, width: f32, height: f32) -> Self {
        Self {
            page_num,
            width,
            height,
            ..Default::default()
        }
    }

    /// Create an empty page with standard Letter size.
    pub fn letter(page_num: u32) -> Self {
        Self::new(page_num, 612.0, 792.0)
    }

    /// All span texts joined by a space, used for caption lookups.
    pub fn joined_text(&self) -> String {
        self.text_spans
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Whether the page produced no content at all.
    pub fn is_empty(&self) -> bool {
        self.text_spans.is_empty()
            && self.drawing_clusters.is_empty()
            && self.images.is_empty()
            && self.tables.is_empty()
    }
}

/// A structural text block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSpan {
    /// Bounding box of the block
    pub bbox: BBox,
    /// Cleaned text; lines are separated by `\n`
    pub text: String,
    /// Average font size, rounded to one decimal
    pub font_size: f32,
    /// Whether the dominant font is bold
    pub is_bold: bool,
    /// Whether the dominant font is italic
    pub is_italic: bool,
    /// Ordinal of the source block on its page
    pub block_no: usize,
}

impl TextSpan {
    /// Create a plain span (regular weight, 10pt).
    pub fn new(text: impl Into<String>, bbox: BBox, block_no: usize) -> Self {
        Self {
            bbox,
            text: text.into(),
            font_size: 10.0,
            is_bold: false,
            is_italic: false,
            block_no,
        }
    }
}

/// A region of merged vector drawing primitives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingCluster {
    /// Union of all member boxes
    pub bbox: BBox,
    /// Area of `bbox`
    pub area: f32,
    /// Number of primitive boxes merged into this cluster
    pub element_count: usize,
}

impl DrawingCluster {
    pub fn new(bbox: BBox, element_count: usize) -> Self {
        Self {
            bbox,
            area: bbox.area(),
            element_count,
        }
    }
}

/// A raster image placed on the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageBlock {
    /// Placement on the page
    pub bbox: BBox,
    /// Unique raster reference (object number of the image stream)
    pub ref_id: u32,
    /// Pixel width
    pub width: u32,
    /// Pixel height
    pub height: u32,
}

/// A table grid before any header or row reconstruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    /// Table region on the page
    pub bbox: BBox,
    /// Rows of nullable cells
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    pub fn new(bbox: BBox, rows: Vec<Vec<Option<String>>>) -> Self {
        Self { bbox, rows }
    }

    /// Widest row length.
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(|r| r.len()).max().unwrap_or(0)
    }

    /// Fraction of cells holding non-blank text.
    pub fn fill_rate(&self) -> f32 {
        let total: usize = self.rows.iter().map(|r| r.len()).sum();
        if total == 0 {
            return 0.0;
        }
        let filled = self
            .rows
            .iter()
            .flatten()
            .filter(|c| is_filled(c.as_deref()))
            .count();
        filled as f32 / total as f32
    }
}

/// Whether a nullable cell holds non-blank text.
pub fn is_filled(cell: Option<&str>) -> bool {
    cell.map(|c| !c.trim().is_empty()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_rate() {
        let table = RawTable::new(
            BBox::default(),
            vec![
                vec![Some("a".into()), None],
                vec![Some(" ".into()), Some("b".into())],
            ],
        );
        assert_eq!(table.column_count(), 2);
        assert!((table.fill_rate() - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_joined_text() {
        let mut page = PageModel::letter(1);
        page.text_spans
            .push(TextSpan::new("Table 3 - Commands", BBox::default(), 0));
        page.text_spans.push(TextSpan::new("body", BBox::default(), 1));
        assert_eq!(page.joined_text(), "Table 3 - Commands body");
        assert!(!page.is_empty());
    }
}
