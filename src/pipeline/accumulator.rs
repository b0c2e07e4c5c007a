//! Running text carried across blocks and pages until something interrupts it.

use crate::model::{ContentType, SectionId};

/// Text taken out of the accumulator, ready for the text chunker.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingText {
    /// Buffered block texts joined by newlines
    pub text: String,
    pub content_type: ContentType,
    pub section: Option<SectionId>,
    pub page_start: u32,
    pub page_end: u32,
}

/// Buffered text blocks of one content type within one section.
///
/// Page ends never empty the buffer; only [`TextAccumulator::take`] does.
/// That keeps paragraphs and lists that run over a page break together.
#[derive(Debug, Clone)]
pub struct TextAccumulator {
    buffer: Vec<String>,
    content_type: ContentType,
    section: Option<SectionId>,
    page_span: Option<(u32, u32)>,
}

impl Default for TextAccumulator {
    fn default() -> Self {
        Self {
            buffer: Vec::new(),
            content_type: ContentType::Text,
            section: None,
            page_span: None,
        }
    }
}

impl TextAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Content type of the buffered text.
    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    /// `(first, last)` page of the buffered text.
    pub fn page_span(&self) -> Option<(u32, u32)> {
        self.page_span
    }

    /// Whether a block of `content_type` must flush the buffer before it
    /// can be appended.
    pub fn needs_flush_for(&self, content_type: ContentType) -> bool {
        !self.is_empty() && self.content_type != content_type
    }

    /// Append one block's text found on `page`.
    ///
    /// The first block after a flush fixes the section and start page.
    pub fn push(&mut self, text: &str, content_type: ContentType, section: Option<SectionId>, page: u32) {
        if self.buffer.is_empty() {
            self.section = section;
            self.page_span = Some((page, page));
        } else if let Some((_, end)) = self.page_span.as_mut() {
            *end = page;
        }
        self.content_type = content_type;
        self.buffer.push(text.to_string());
    }

    /// Empty the buffer, returning its joined text.
    pub fn take(&mut self) -> Option<PendingText> {
        if self.buffer.is_empty() {
            return None;
        }
        let (page_start, page_end) = self.page_span.take().unwrap_or((1, 1));
        let text = self.buffer.join("\n");
        self.buffer.clear();
        Some(PendingText {
            text,
            content_type: self.content_type,
            section: self.section.take(),
            page_start,
            page_end,
        })
    }
}
