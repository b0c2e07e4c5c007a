//! Section hierarchy types.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One table-of-contents entry as read from the document outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    /// Nesting depth, 1 for top-level entries
    pub level: u8,
    /// Entry title including any numeric prefix, e.g. "6.10.4 Detailed command description"
    pub title: String,
    /// Destination page (1-indexed)
    pub page: u32,
}

impl TocEntry {
    pub fn new(level: u8, title: impl Into<String>, page: u32) -> Self {
        Self {
            level,
            title: title.into(),
            page,
        }
    }
}

/// A section of the document with its page range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionNode {
    /// TOC depth (1-5)
    pub level: u8,
    /// Title without the numeric prefix
    pub title: String,
    /// First page (1-indexed)
    pub page_start: u32,
    /// Last page (inclusive)
    pub page_end: u32,
    /// Numeric prefix, e.g. "6.10.4"; empty when unnumbered
    pub number: String,
    /// Cumulative path, e.g. ["6", "6.10", "6.10.4"]
    pub path: Vec<String>,
    /// Whether the section starts before the body
    pub is_front_matter: bool,
}

impl SectionNode {
    /// Human-readable label, e.g. "6.10.4 Detailed command description".
    pub fn label(&self) -> String {
        match self.path.last() {
            Some(number) if !self.title.is_empty() => format!("{} {}", number, self.title),
            _ => self.title.clone(),
        }
    }

    /// Whether `page` lies inside this section's range.
    pub fn covers(&self, page: u32) -> bool {
        self.page_start <= page && page <= self.page_end
    }
}

/// Index of a section inside [`DocumentStructure::sections`].
pub type SectionId = usize;

/// The resolved section hierarchy of one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentStructure {
    /// All sections in TOC order
    pub sections: Vec<SectionNode>,
    /// Page number → deepest covering section
    pub page_to_section: BTreeMap<u32, SectionId>,
    /// Normalized label → first section carrying it, in TOC order
    pub label_to_section: IndexMap<String, SectionId>,
    /// First page that is not front matter
    pub body_start_page: u32,
    /// Page count of the document
    pub total_pages: u32,
}

impl DocumentStructure {
    /// Section by id.
    pub fn section(&self, id: SectionId) -> Option<&SectionNode> {
        self.sections.get(id)
    }

    /// Section id resolved for a page.
    pub fn section_id_for_page(&self, page: u32) -> Option<SectionId> {
        self.page_to_section.get(&page).copied()
    }

    /// Section resolved for a page.
    pub fn section_for_page(&self, page: u32) -> Option<&SectionNode> {
        self.section_id_for_page(page)
            .and_then(|id| self.sections.get(id))
    }
}
