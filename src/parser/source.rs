//! Page sources: anything the ingestion pipeline can pull pages from.

use crate::error::{Error, Result};
use crate::model::{PageModel, TocEntry};

/// A document that yields one [`PageModel`] per page plus its table of contents.
///
/// The pipeline asks for pages strictly in ascending order; implementations may
/// therefore produce pages lazily.
pub trait PageSource {
    /// Source identifier recorded on every chunk (usually the file name).
    fn source(&self) -> &str;

    /// Document revision, e.g. "5.1".
    fn version(&self) -> &str;

    /// Number of pages.
    fn page_count(&self) -> u32;

    /// Flattened table of contents.
    fn toc(&self) -> Result<Vec<TocEntry>>;

    /// Extract one page (1-indexed).
    fn extract(&self, page: u32) -> Result<PageModel>;
}

/// A page source backed by pre-built page models.
///
/// Useful for feeding the pipeline from another extractor, and for tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    source: String,
    version: String,
    toc: Vec<TocEntry>,
    pages: Vec<PageModel>,
}

impl MemorySource {
    pub fn new(source: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            version: version.into(),
            ..Default::default()
        }
    }

    /// Set the table of contents.
    pub fn with_toc(mut self, toc: Vec<TocEntry>) -> Self {
        self.toc = toc;
        self
    }

    /// Append a page; pages are numbered by their own `page_num`.
    pub fn with_page(mut self, page: PageModel) -> Self {
        self.pages.push(page);
        self
    }

    /// Append several pages.
    pub fn with_pages(mut self, pages: impl IntoIterator<Item = PageModel>) -> Self {
        self.pages.extend(pages);
        self
    }
}

impl PageSource for MemorySource {
    fn source(&self) -> &str {
        &self.source
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn page_count(&self) -> u32 {
        self.pages.iter().map(|p| p.page_num).max().unwrap_or(0)
    }

    fn toc(&self) -> Result<Vec<TocEntry>> {
        Ok(self.toc.clone())
    }

    fn extract(&self, page: u32) -> Result<PageModel> {
        match self.pages.iter().find(|p| p.page_num == page) {
            Some(model) => Ok(model.clone()),
            // Gaps in the page list read as blank pages
            None if page >= 1 && page <= self.page_count() => Ok(PageModel::letter(page)),
            None => Err(Error::PageOutOfRange(page, self.page_count())),
        }
    }
}
