//! Per-page extraction over two independent back-ends.
//!
//! [`GeometryBackend`] reads text blocks, drawing primitives and image
//! placements; [`TableBackend`] reads glyph-level words and ruling edges for
//! table detection. Each interprets the page on its own, so a failure in one
//! leaves the other's output intact.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::detect::{detect_format_from_path, source_name, version_from_filename};
use crate::error::{Error, Result};
use crate::model::{BBox, DrawingCluster, ImageBlock, PageModel, RawTable, TextSpan, TocEntry};

use super::backend::{LopdfBackend, PageBox, PageId, PdfBackend};
use super::cleanup::CleanupPipeline;
use super::content::{ContentInterpreter, PageContent, TextRun};
use super::drawings::cluster_drawings;
use super::lattice::{edges_from_segments, Edge};
use super::layout::{split_words, LayoutAnalyzer, Word};
use super::options::{ErrorMode, ExtractOptions};
use super::source::PageSource;
use super::tables::TableExtractor;

/// Text, drawing and image geometry of a page.
pub struct GeometryBackend {
    doc: Arc<LopdfBackend>,
}

impl GeometryBackend {
    pub fn new(doc: Arc<LopdfBackend>) -> Self {
        Self { doc }
    }

    /// Interpret the page's content stream.
    pub fn read_page(&self, page: PageId) -> Result<PageContent> {
        ContentInterpreter::new(self.doc.as_ref(), page).run()
    }

    pub fn page_box(&self, page: PageId) -> PageBox {
        self.doc.page_box(page)
    }
}

/// Words, runs and ruling edges of a page, as consumed by table detection.
#[derive(Debug, Clone, Default)]
pub struct TableLayer {
    pub runs: Vec<TextRun>,
    pub words: Vec<Word>,
    pub edges: Vec<Edge>,
}

/// Glyph-level view of a page for table detection.
pub struct TableBackend {
    doc: Arc<LopdfBackend>,
}

impl TableBackend {
    pub fn new(doc: Arc<LopdfBackend>) -> Self {
        Self { doc }
    }

    pub fn read_page(&self, page: PageId) -> Result<TableLayer> {
        let content = ContentInterpreter::new(self.doc.as_ref(), page).run()?;
        let segments: Vec<_> = content
            .paths
            .iter()
            .flat_map(|p| p.segments.iter().copied())
            .collect();
        Ok(TableLayer {
            words: split_words(&content.runs),
            edges: edges_from_segments(&segments),
            runs: content.runs,
        })
    }
}

/// Produces one [`PageModel`] per page of a PDF file.
///
/// Both back-ends share the parsed document and release it when the
/// extractor is dropped.
pub struct PageExtractor {
    source: String,
    version: String,
    geometry: GeometryBackend,
    tables: TableBackend,
    outline: Arc<LopdfBackend>,
    pages: BTreeMap<u32, PageId>,
    options: ExtractOptions,
    cleanup: CleanupPipeline,
    layout: LayoutAnalyzer,
    table_extractor: TableExtractor,
}

impl PageExtractor {
    /// Open a PDF file.
    ///
    /// Missing, unreadable, non-PDF and undecryptable files fail here.
    pub fn open<P: AsRef<Path>>(path: P, options: ExtractOptions) -> Result<Self> {
        let path = path.as_ref();
        detect_format_from_path(path)?;
        let backend = LopdfBackend::load_file(path)?;
        let source = source_name(path);
        let version = version_from_filename(&source);
        Self::with_backend(source, version, backend, options)
    }

    /// Open a PDF held in memory; `name` plays the role of the file name.
    pub fn from_bytes(name: &str, data: &[u8], options: ExtractOptions) -> Result<Self> {
        let backend = LopdfBackend::load_bytes(data)?;
        Self::with_backend(
            name.to_string(),
            version_from_filename(name),
            backend,
            options,
        )
    }

    fn with_backend(
        source: String,
        version: String,
        backend: LopdfBackend,
        options: ExtractOptions,
    ) -> Result<Self> {
        let cleanup = CleanupPipeline::new(options.cleanup.clone(), &options.extra_watermarks)?;
        let doc = Arc::new(backend);
        let pages = doc.pages();
        log::debug!("Opened {} ({} pages)", source, pages.len());

        Ok(Self {
            source,
            version,
            geometry: GeometryBackend::new(Arc::clone(&doc)),
            tables: TableBackend::new(Arc::clone(&doc)),
            outline: doc,
            pages,
            layout: LayoutAnalyzer::new(options.layout.clone()),
            table_extractor: TableExtractor::new(
                options.table_settings.clone(),
                options.stream.clone(),
            ),
            cleanup,
            options,
        })
    }

    /// Extraction options in effect.
    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Apply the error mode to one extractor's result.
    fn guarded<T: Default>(&self, page: u32, what: &str, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => Ok(value),
            Err(e) if self.options.error_mode == ErrorMode::Lenient => {
                log::warn!("Page {}: {} extraction failed: {}", page, what, e);
                Ok(T::default())
            }
            Err(e) => Err(e),
        }
    }

    fn text_spans(&self, content: &PageContent, page_height: f32) -> Vec<TextSpan> {
        let footer_line = page_height - self.options.footer_margin;
        // Runs in the margin bands never reach layout, so a running header
        // cannot merge into the first body block
        let runs: Vec<TextRun> = content
            .runs
            .iter()
            .filter(|run| {
                let bbox = run.bbox();
                bbox.bottom >= self.options.header_margin && bbox.top <= footer_line
            })
            .cloned()
            .collect();
        let blocks = self.layout.analyze(runs);

        blocks
            .iter()
            .enumerate()
            .filter_map(|(block_no, block)| {
                let bbox = block.bbox()?;
                let text = self.cleanup.process(&block.text());
                if text.is_empty() {
                    return None;
                }
                Some(TextSpan {
                    bbox,
                    text,
                    font_size: block.font_size(),
                    is_bold: block.is_bold(),
                    is_italic: block.is_italic(),
                    block_no,
                })
            })
            .collect()
    }

    fn drawing_clusters(&self, content: &PageContent) -> Vec<DrawingCluster> {
        let boxes: Vec<BBox> = content.paths.iter().map(|p| p.bbox).collect();
        cluster_drawings(&boxes, self.options.cluster_padding, self.options.min_figure_area)
    }

    fn images(content: &PageContent) -> Vec<ImageBlock> {
        content
            .images
            .iter()
            .map(|img| ImageBlock {
                bbox: img.bbox,
                ref_id: img.ref_id,
                width: img.width,
                height: img.height,
            })
            .collect()
    }

    fn raw_tables(&self, layer: &TableLayer, page_width: f32) -> Vec<RawTable> {
        self.table_extractor.extract(
            &layer.words,
            &layer.runs,
            &layer.edges,
            page_width,
            &self.cleanup,
        )
    }
}

/// Borrow a shared back-end result for one of several extractors.
fn shared<T>(result: &Result<T>) -> Result<&T> {
    result
        .as_ref()
        .map_err(|e| Error::ContentStream(e.to_string()))
}

impl PageSource for PageExtractor {
    fn source(&self) -> &str {
        &self.source
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn toc(&self) -> Result<Vec<TocEntry>> {
        self.outline.outline()
    }

    fn extract(&self, page_num: u32) -> Result<PageModel> {
        let page_id = *self
            .pages
            .get(&page_num)
            .ok_or(Error::PageOutOfRange(page_num, self.page_count()))?;

        let page_box = self.geometry.page_box(page_id);
        let mut model = PageModel::new(page_num, page_box.width(), page_box.height());

        let geometry = self.geometry.read_page(page_id);
        model.text_spans = self.guarded(
            page_num,
            "text",
            shared(&geometry).map(|c| self.text_spans(c, model.height)),
        )?;
        model.drawing_clusters = self.guarded(
            page_num,
            "drawing",
            shared(&geometry).map(|c| self.drawing_clusters(c)),
        )?;
        model.images = self.guarded(page_num, "image", shared(&geometry).map(Self::images))?;

        let layer = self.tables.read_page(page_id);
        model.tables = self.guarded(
            page_num,
            "table",
            layer.map(|l| self.raw_tables(&l, model.width)),
        )?;

        log::debug!(
            "Page {}: {} spans, {} drawings, {} images, {} tables",
            page_num,
            model.text_spans.len(),
            model.drawing_clusters.len(),
            model.images.len(),
            model.tables.len()
        );
        Ok(model)
    }
}
