//! Figure and bitmap chunks: caption plus enclosed labels.

use lazy_static::lazy_static;
use regex::Regex;

use crate::model::{BBox, Chunk, ContentType, DrawingCluster, ImageBlock, PageModel, SectionNode};

use super::{ChunkContext, ChunkIds};

lazy_static! {
    static ref FIGURE_CAPTION: Regex = Regex::new(r"(?i)Figure\s+\d+[\s—\-:]+[^\n]{3,120}").unwrap();
}

/// Nearest `Figure N - title` caption within `margin` points above or below `bbox`.
///
/// Ties keep the block that comes first on the page.
pub fn find_figure_caption(page: &PageModel, bbox: &BBox, margin: f32) -> Option<String> {
    let mut best: Option<(f32, String)> = None;
    for span in &page.text_spans {
        let distance = bbox.vertical_distance(&span.bbox);
        if !(0.0..=margin).contains(&distance) {
            continue;
        }
        let Some(m) = FIGURE_CAPTION.find(&span.text) else {
            continue;
        };
        if best.as_ref().map(|(d, _)| distance < *d).unwrap_or(true) {
            best = Some((distance, m.as_str().trim().to_string()));
        }
    }
    best.map(|(_, caption)| caption)
}

/// Texts of spans whose center lies inside `bbox`.
fn labels_inside(page: &PageModel, bbox: &BBox) -> Vec<String> {
    page.text_spans
        .iter()
        .filter(|s| bbox.contains_center_of(&s.bbox, 0.0))
        .map(|s| s.text.trim().to_string())
        .collect()
}

/// Builds chunks for vector drawings and raster images.
#[derive(Debug, Clone)]
pub struct FigureChunker {
    /// Vertical caption search window (points)
    search_margin: f32,
}

impl Default for FigureChunker {
    fn default() -> Self {
        Self::new(40.0)
    }
}

impl FigureChunker {
    pub fn new(search_margin: f32) -> Self {
        Self { search_margin }
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        ctx: &ChunkContext<'_>,
        ids: &mut ChunkIds,
        section: Option<&SectionNode>,
        page: u32,
        content_type: ContentType,
        caption: Option<String>,
        labels: Vec<String>,
        fallback: &str,
    ) -> Chunk {
        let mut body = format!("[Figure: {}]", caption.as_deref().unwrap_or(fallback));
        if !labels.is_empty() {
            body.push('\n');
            body.push_str(&labels.join("\n"));
        }
        let prefix = format!("{}\n", ctx.header(section, page));
        let mut chunk = ctx.chunk(ids, section, content_type, page, page, 0, &prefix, body);
        chunk.figure_caption = caption;
        chunk
    }

    /// A chunk for a drawing cluster, or `None` when it has neither caption
    /// nor enclosed text.
    pub fn chunk_figure(
        &self,
        ctx: &ChunkContext<'_>,
        ids: &mut ChunkIds,
        cluster: &DrawingCluster,
        page: &PageModel,
        section: Option<&SectionNode>,
    ) -> Option<Chunk> {
        let caption = find_figure_caption(page, &cluster.bbox, self.search_margin);
        let labels = labels_inside(page, &cluster.bbox);
        if caption.is_none() && labels.is_empty() {
            log::debug!("Figure on page {} has no caption or labels, skipped", page.page_num);
            return None;
        }
        Some(Self::build(
            ctx,
            ids,
            section,
            page.page_num,
            ContentType::Figure,
            caption,
            labels,
            "(no caption)",
        ))
    }

    /// A chunk for a raster image; text just above and below counts as its labels.
    pub fn chunk_bitmap(
        &self,
        ctx: &ChunkContext<'_>,
        ids: &mut ChunkIds,
        image: &ImageBlock,
        page: &PageModel,
        section: Option<&SectionNode>,
    ) -> Option<Chunk> {
        let caption = find_figure_caption(page, &image.bbox, self.search_margin);
        let mut region = image.bbox.expand(0.0, self.search_margin);
        region.top = region.top.max(0.0);
        let surrounding = labels_inside(page, &region);
        if caption.is_none() && surrounding.is_empty() {
            log::debug!("Bitmap on page {} has no caption or nearby text, skipped", page.page_num);
            return None;
        }
        Some(Self::build(
            ctx,
            ids,
            section,
            page.page_num,
            ContentType::Bitmap,
            caption,
            surrounding,
            "bitmap image",
        ))
    }
}
