//! Whole-document orchestration.
//!
//! The pipeline walks pages strictly in order, keeps track of the active
//! section, carries running text across page breaks, and routes tables,
//! figures and bitmaps to their chunkers. Definitions are collected in two
//! rounds once every page has been seen.

mod accumulator;
mod filter;
mod options;
mod output;
mod result;

pub use accumulator::{PendingText, TextAccumulator};
pub use filter::{is_noise, is_searchable, is_valid_chunk, min_raw_chars, MIN_ROW_CHUNK_CHARS};
pub use options::{IngestOptions, DEFAULT_REGISTER_MAP_KEYWORDS};
pub use output::{output_path, write_jsonl};
pub use result::{IngestionResult, IngestionStats};

use indexmap::IndexMap;

use crate::chunk::{
    ChunkContext, ChunkIds, DefinitionChunker, FigureChunker, SeenTerms, TableChunker, TextChunker,
};
use crate::classify::{Block, BlockClassifier};
use crate::error::Result;
use crate::model::{Chunk, ContentType, DocumentStructure, PageModel, SectionId, SectionNode};
use crate::parser::PageSource;
use crate::structure::{match_section_label, normalize_label, StructureExtractor};

/// Turns one document into chunks.
///
/// A pipeline holds configuration only; every call to [`run`](Self::run)
/// starts from fresh state, so one instance can serve many documents.
#[derive(Debug, Clone)]
pub struct IngestionPipeline {
    options: IngestOptions,
    structure: StructureExtractor,
    classifier: BlockClassifier,
    text: TextChunker,
    table: TableChunker,
    figure: FigureChunker,
    definition: DefinitionChunker,
}

impl Default for IngestionPipeline {
    fn default() -> Self {
        Self::new(IngestOptions::default())
    }
}

impl IngestionPipeline {
    pub fn new(options: IngestOptions) -> Self {
        Self {
            text: TextChunker::new(
                options.chunk_chars,
                options.chunk_overlap,
                options.register_atomic_factor,
            ),
            table: TableChunker::new(options.max_table_chars),
            figure: FigureChunker::new(options.caption_search_margin),
            definition: DefinitionChunker::new(),
            structure: StructureExtractor::new(),
            classifier: BlockClassifier::new(),
            options,
        }
    }

    pub fn options(&self) -> &IngestOptions {
        &self.options
    }

    /// Process every page of `source` in order.
    ///
    /// Errors from the source (unreadable outline, a page failing in strict
    /// mode) abort the document; nothing is written by this method.
    pub fn run(&self, source: &dyn PageSource) -> Result<IngestionResult> {
        let total_pages = source.page_count();
        log::info!(
            "Ingesting {} (version {}, {} pages)",
            source.source(),
            source.version(),
            total_pages
        );

        let toc = source.toc()?;
        let structure = self.structure.extract(&toc, total_pages);

        let ctx = ChunkContext::new(source.source(), source.version())
            .with_product(self.options.product_name.as_deref());
        let mut run = Run::new(self, &structure, ctx, source.source());

        for page_num in 1..=total_pages {
            let page = source.extract(page_num)?;
            run.process_page(&page);
        }
        run.flush();
        run.collect_definitions();

        let chunks = run.chunks;
        log::info!("Total chunks: {}", chunks.len());
        Ok(IngestionResult::new(
            source.source(),
            source.version(),
            total_pages,
            structure,
            chunks,
            &self.options,
        ))
    }
}

/// Mutable state of one run.
struct Run<'p, 's> {
    pipeline: &'p IngestionPipeline,
    structure: &'s DocumentStructure,
    ctx: ChunkContext<'s>,
    ids: ChunkIds,
    seen: SeenTerms,
    current: Option<SectionId>,
    acc: TextAccumulator,
    /// Block texts per body section, for round-one definitions
    buckets: IndexMap<SectionId, Vec<String>>,
    /// Definition-typed text per section, chunked as text if round one
    /// finds no entries in it
    held: IndexMap<SectionId, TextAccumulator>,
    /// Block text per page, for round-two definitions
    page_texts: Vec<(u32, String)>,
    chunks: Vec<Chunk>,
}

impl<'p, 's> Run<'p, 's> {
    fn new(
        pipeline: &'p IngestionPipeline,
        structure: &'s DocumentStructure,
        ctx: ChunkContext<'s>,
        source: &str,
    ) -> Self {
        Self {
            pipeline,
            structure,
            ctx,
            ids: ChunkIds::new(pipeline.options.id_scheme, source),
            seen: SeenTerms::new(),
            current: None,
            acc: TextAccumulator::new(),
            buckets: IndexMap::new(),
            held: IndexMap::new(),
            page_texts: Vec::new(),
            chunks: Vec::new(),
        }
    }

    fn section(&self) -> Option<&'s SectionNode> {
        let structure: &'s DocumentStructure = self.structure;
        self.current.and_then(|id| structure.section(id))
    }

    fn switch_to(&mut self, section: Option<SectionId>) {
        if section != self.current {
            self.flush();
            self.current = section;
        }
    }

    /// Chunk whatever running text is buffered.
    fn flush(&mut self) {
        let Some(pending) = self.acc.take() else {
            return;
        };
        let structure: &'s DocumentStructure = self.structure;
        let section = pending.section.and_then(|id| structure.section(id));
        let chunks = self.pipeline.text.chunk_section(
            &self.ctx,
            &mut self.ids,
            &pending.text,
            section,
            pending.page_start,
            pending.page_end,
            pending.content_type,
        );
        self.chunks.extend(chunks);
    }

    fn process_page(&mut self, page: &PageModel) {
        let page_num = page.page_num;
        // The page map is authoritative at page granularity; the running
        // text never flushes just because the page ended.
        self.switch_to(self.structure.section_id_for_page(page_num));

        let page_text = page.joined_text();
        let classified = self.pipeline.classifier.classify(page, self.section());
        let mut span_texts: Vec<&str> = Vec::new();

        for cb in &classified {
            if cb.content_type == ContentType::Text {
                if let Some(text) = cb.block.text() {
                    self.detect_heading(text, page_num);
                }
            }

            if let Block::Span(span) = &cb.block {
                span_texts.push(&span.text);
                let in_body = self.section().map(|s| !s.is_front_matter).unwrap_or(false);
                if let (true, Some(id)) = (in_body, self.current) {
                    self.buckets.entry(id).or_default().push(span.text.clone());
                }
            }

            match (&cb.block, cb.content_type) {
                (Block::Span(span), content_type) if content_type.is_running_text() => {
                    if self.acc.needs_flush_for(content_type) {
                        self.flush();
                    }
                    self.acc.push(&span.text, content_type, self.current, page_num);
                }
                (Block::Table(table), _) => {
                    self.flush();
                    self.route_table(&table.rows, &page_text, page_num);
                }
                (Block::Drawing(cluster), _) => {
                    self.flush();
                    let section = self.section();
                    if let Some(chunk) = self.pipeline.figure.chunk_figure(
                        &self.ctx,
                        &mut self.ids,
                        cluster,
                        page,
                        section,
                    ) {
                        self.chunks.push(chunk);
                    }
                }
                (Block::Image(image), _) => {
                    self.flush();
                    let section = self.section();
                    if let Some(chunk) = self.pipeline.figure.chunk_bitmap(
                        &self.ctx,
                        &mut self.ids,
                        image,
                        page,
                        section,
                    ) {
                        self.chunks.push(chunk);
                    }
                }
                (Block::Span(span), ContentType::Definition) => {
                    if let Some(id) = self.current {
                        self.held
                            .entry(id)
                            .or_default()
                            .push(&span.text, ContentType::Text, Some(id), page_num);
                    }
                }
                _ => {}
            }
        }

        if !span_texts.is_empty() {
            self.page_texts.push((page_num, span_texts.join("\n")));
        }
    }

    /// Switch sections when a text block opens a known heading.
    fn detect_heading(&mut self, text: &str, page_num: u32) {
        let normalized = normalize_label(text);
        let Some(hit) = match_section_label(self.structure, &normalized) else {
            return;
        };
        if Some(hit) == self.current {
            return;
        }
        self.switch_to(Some(hit));
        if let Some(section) = self.section() {
            log::debug!("Switched section at page {}: {}", page_num, section.label());
        }
    }

    fn route_table(&mut self, rows: &[Vec<Option<String>>], page_text: &str, page_num: u32) {
        let section = self.section();
        let table = &self.pipeline.table;
        let full = table.chunk(&self.ctx, &mut self.ids, rows, page_text, section, page_num);
        let Some(parent_id) = full.first().map(|c| c.chunk_id.clone()) else {
            return;
        };
        let groups = table.chunk_row_groups(
            &self.ctx,
            &mut self.ids,
            rows,
            page_text,
            section,
            page_num,
            &parent_id,
        );
        self.chunks.extend(full);
        self.chunks.extend(groups);
    }

    /// Round one over dedicated sections, then round two over body pages.
    fn collect_definitions(&mut self) {
        let structure: &'s DocumentStructure = self.structure;
        let pipeline: &'p IngestionPipeline = self.pipeline;
        let definition = &pipeline.definition;

        for (id, section) in structure.sections.iter().enumerate() {
            let found = match self.buckets.get(&id) {
                Some(bucket) if !section.is_front_matter => {
                    let text = bucket.join(" \n");
                    definition.extract_from_section(&self.ctx, &mut self.ids, &mut self.seen, &text, section)
                }
                _ => Vec::new(),
            };
            if found.is_empty() {
                self.chunk_held(id, section);
            }
            self.chunks.extend(found);
        }

        let page_texts = std::mem::take(&mut self.page_texts);
        let mut inline = 0usize;
        for (page_num, text) in &page_texts {
            let Some(section) = structure.section_for_page(*page_num) else {
                continue;
            };
            if section.is_front_matter {
                continue;
            }
            let found = definition.extract_inline(
                &self.ctx,
                &mut self.ids,
                &mut self.seen,
                text,
                Some(section),
                *page_num,
            );
            inline += found.len();
            self.chunks.extend(found);
        }
        log::debug!("Definitions: {} inline, {} terms seen", inline, self.seen.len());
    }

    /// Chunk a definition section's text as ordinary text.
    fn chunk_held(&mut self, id: SectionId, section: &'s SectionNode) {
        let Some(pending) = self.held.get_mut(&id).and_then(TextAccumulator::take) else {
            return;
        };
        log::debug!("No definition entries in '{}', keeping it as text", section.title);
        let chunks = self.pipeline.text.chunk_section(
            &self.ctx,
            &mut self.ids,
            &pending.text,
            Some(section),
            pending.page_start,
            pending.page_end,
            ContentType::Text,
        );
        self.chunks.extend(chunks);
    }
}
