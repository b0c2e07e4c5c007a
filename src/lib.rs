//! # specchunk
//!
//! Ingest technical specification PDFs into self-describing, independently
//! retrievable chunks.
//!
//! Every page is extracted into a geometric model (text blocks, drawing
//! clusters, images, table grids), attributed to a section of the document's
//! table of contents, classified block by block, and cut into text, table,
//! figure and definition chunks. Each chunk carries a one-line context header
//! so it stays meaningful without the source PDF.
//!
//! ## Quick Start
//!
//! ```no_run
//! use specchunk::{ingest_file, write_jsonl, output_path};
//!
//! fn main() -> specchunk::Result<()> {
//!     let result = ingest_file("JESD84-B51.pdf")?;
//!     println!("{}", result.stats());
//!
//!     let path = output_path("data/processed", &result.source);
//!     write_jsonl(&path, result.chunks())?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Section attribution**: page ranges from the outline, plus headings
//!   detected inside pages
//! - **Table reconstruction**: multi-row headers merged, notes separated,
//!   merged key cells forward-filled, one row-group chunk per key
//! - **Cross-page text**: paragraphs and lists spanning a page break stay
//!   together
//! - **Definitions**: glossary sections and inline definitions, deduplicated
//! - **Parallel batches**: independent documents processed with Rayon

pub mod chunk;
pub mod classify;
pub mod detect;
pub mod error;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod structure;

// Re-export commonly used types
pub use chunk::{ChunkContext, IdScheme};
pub use classify::{BlockClassifier, ClassifiedBlock};
pub use detect::{detect_format_from_bytes, detect_format_from_path, is_pdf, version_from_filename};
pub use error::{Error, Result};
pub use model::{
    BBox, Chunk, ContentType, DocumentStructure, DrawingCluster, ImageBlock, PageModel, RawTable,
    SectionNode, TextSpan, TocEntry,
};
pub use parser::{ErrorMode, ExtractOptions, MemorySource, PageExtractor, PageSource};
pub use pipeline::{
    output_path, write_jsonl, IngestOptions, IngestionPipeline, IngestionResult, IngestionStats,
};
pub use structure::StructureExtractor;

use std::path::{Path, PathBuf};

use rayon::prelude::*;

/// Ingest a PDF file with default options.
///
/// # Example
///
/// ```no_run
/// use specchunk::ingest_file;
///
/// let result = ingest_file("JESD84-B51.pdf").unwrap();
/// println!("{} searchable chunks", result.searchable_chunks().len());
/// ```
pub fn ingest_file<P: AsRef<Path>>(path: P) -> Result<IngestionResult> {
    ingest_file_with_options(path, &IngestOptions::default())
}

/// Ingest a PDF file with custom options.
///
/// # Example
///
/// ```no_run
/// use specchunk::{ingest_file_with_options, IngestOptions};
///
/// let options = IngestOptions::new().with_product("eMMC").strict();
/// let result = ingest_file_with_options("JESD84-B51.pdf", &options).unwrap();
/// ```
pub fn ingest_file_with_options<P: AsRef<Path>>(path: P, options: &IngestOptions) -> Result<IngestionResult> {
    let extractor = PageExtractor::open(path, options.extract.clone())?;
    IngestionPipeline::new(options.clone()).run(&extractor)
}

/// Ingest a PDF held in memory; `name` stands in for the file name.
pub fn ingest_bytes(name: &str, data: &[u8], options: &IngestOptions) -> Result<IngestionResult> {
    let extractor = PageExtractor::from_bytes(name, data, options.extract.clone())?;
    IngestionPipeline::new(options.clone()).run(&extractor)
}

/// Ingest several documents in parallel.
///
/// Each document runs its own pipeline; a failure is reported for that
/// document only. Results come back in input order.
pub fn ingest_batch<P>(paths: &[P], options: &IngestOptions) -> Vec<(PathBuf, Result<IngestionResult>)>
where
    P: AsRef<Path> + Sync,
{
    paths
        .par_iter()
        .map(|path| {
            let path = path.as_ref();
            (path.to_path_buf(), ingest_file_with_options(path, options))
        })
        .collect()
}

/// Read the flattened outline of a PDF file.
pub fn read_toc<P: AsRef<Path>>(path: P) -> Result<Vec<TocEntry>> {
    let extractor = PageExtractor::open(path, ExtractOptions::default())?;
    extractor.toc()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_fails() {
        let result = ingest_file("does/not/exist.pdf");
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_batch_reports_each_document() {
        let results = ingest_batch(&["missing-a.pdf", "missing-b.pdf"], &IngestOptions::default());
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, PathBuf::from("missing-a.pdf"));
        assert!(results.iter().all(|(_, r)| r.is_err()));
    }
}
