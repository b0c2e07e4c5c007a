//! Term and abbreviation definitions.
//!
//! Round 1 reads dedicated definition sections (high precision); round 2
//! picks up inline definitions anywhere in the body text. Both rounds share
//! one [`SeenTerms`] set per run so a term is emitted once.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

use crate::model::{Chunk, ContentType, SectionNode};

use super::{ChunkContext, ChunkIds};

lazy_static! {
    /// `ACMD - Application-specific command`, `HS200: High speed 200 MHz`
    static ref ABBREVIATION: Regex =
        Regex::new(r"(?m)^([A-Z][A-Z0-9_/\-]{1,20})\s*[:\-–—]\s*(.{10,200})$").unwrap();
    /// `3.1.1 Term` followed by its definition on the next line
    static ref NUMBERED: Regex =
        Regex::new(r"(?m)^\d+(?:\.\d+)+\s+([A-Za-z][^\n]{3,60})\n(.{20,500})").unwrap();
    /// `X means / is defined as / refers to Y`
    static ref INLINE_MEANS: Regex = Regex::new(
        r"(?i)([A-Z][A-Za-z0-9_\-\s]{2,40}?)\s+(?:means|is defined as|refers to)\s+(.{10,200})"
    )
    .unwrap();
    /// `Long form (abbreviated as LF)`
    static ref INLINE_ABBREVIATED: Regex = Regex::new(
        r"(?i)([A-Z][A-Za-z0-9_\-\s]{2,40}?)\s+\(abbreviated\s+as\s+([A-Z][A-Z0-9_\-]{1,15})\)"
    )
    .unwrap();
    static ref LEADING_ARTICLE: Regex = Regex::new(r"(?i)^(?:the|an|a)\s+").unwrap();
}

/// Exact (lowercase) titles of dedicated definition sections.
const DEFINITION_SECTION_TITLES: &[&str] = &[
    "definition",
    "definitions",
    "abbreviation",
    "abbreviations",
    "abbreviated terms",
    "acronym",
    "acronyms",
    "abbreviations and acronyms",
    "glossary",
    "glossary of terms",
    "terms",
    "terms and definitions",
    "terms, definitions and abbreviations",
    "terms, definitions and acronyms",
    "symbols",
    "symbols and abbreviations",
    "symbols and abbreviated terms",
];

/// Whether a section title names a dedicated definition section.
///
/// The classifier and round 1 both ask this, so a section whose text is
/// held back as definitions is always one round 1 reads.
pub fn is_definition_section_title(title: &str) -> bool {
    let lowered = title.trim().to_lowercase();
    DEFINITION_SECTION_TITLES.contains(&lowered.as_str())
}

/// Lowercased terms already emitted in this run.
#[derive(Debug, Clone, Default)]
pub struct SeenTerms(HashSet<String>);

impl SeenTerms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a term; `false` when it was already seen.
    pub fn insert(&mut self, term: &str) -> bool {
        self.0.insert(term.to_lowercase())
    }

    pub fn contains(&self, term: &str) -> bool {
        self.0.contains(&term.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Extracts definition chunks.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefinitionChunker;

impl DefinitionChunker {
    pub fn new() -> Self {
        Self
    }

    #[allow(clippy::too_many_arguments)]
    fn definition_chunk(
        ctx: &ChunkContext<'_>,
        ids: &mut ChunkIds,
        section: Option<&SectionNode>,
        page_start: u32,
        page_end: u32,
        chunk_index: usize,
        term: &str,
        definition: &str,
    ) -> Chunk {
        let prefix = format!("{}\n", ctx.header(section, page_start));
        let raw = format!("{}: {}", term, definition);
        let mut chunk = ctx.chunk(
            ids,
            section,
            ContentType::Definition,
            page_start,
            page_end,
            chunk_index,
            &prefix,
            raw,
        );
        // Definitions stay searchable wherever they were found
        chunk.is_front_matter = false;
        chunk.term = Some(term.to_string());
        chunk
    }

    /// Round 1: entries of a dedicated definition section.
    ///
    /// Abbreviation lines are tried first; numbered entries only when the
    /// section has none. Other sections yield nothing, as do terms already
    /// in `seen`.
    pub fn extract_from_section(
        &self,
        ctx: &ChunkContext<'_>,
        ids: &mut ChunkIds,
        seen: &mut SeenTerms,
        section_text: &str,
        section: &SectionNode,
    ) -> Vec<Chunk> {
        if !is_definition_section_title(&section.title) {
            return Vec::new();
        }

        let mut pairs: Vec<(String, String)> = ABBREVIATION
            .captures_iter(section_text)
            .map(|c| (c[1].trim().to_string(), c[2].trim().to_string()))
            .collect();
        if pairs.is_empty() {
            pairs = NUMBERED
                .captures_iter(section_text)
                .map(|c| (c[1].trim().to_string(), c[2].trim().to_string()))
                .collect();
        }

        let mut chunks = Vec::new();
        for (term, definition) in &pairs {
            if !seen.insert(term) {
                continue;
            }
            let index = chunks.len();
            chunks.push(Self::definition_chunk(
                ctx,
                ids,
                Some(section),
                section.page_start,
                section.page_end,
                index,
                term,
                definition,
            ));
        }
        log::debug!("Definitions: {} from section '{}'", chunks.len(), section.title);
        chunks
    }

    /// Round 2: inline definitions in one page's body text.
    ///
    /// Terms already in `seen` are skipped. For `(abbreviated as X)` the
    /// abbreviation becomes the term and the long form its definition.
    pub fn extract_inline(
        &self,
        ctx: &ChunkContext<'_>,
        ids: &mut ChunkIds,
        seen: &mut SeenTerms,
        text: &str,
        section: Option<&SectionNode>,
        page: u32,
    ) -> Vec<Chunk> {
        let mut pairs: Vec<(String, String)> = Vec::new();
        for caps in INLINE_MEANS.captures_iter(text) {
            pairs.push((strip_article(&caps[1]), caps[2].trim().to_string()));
        }
        for caps in INLINE_ABBREVIATED.captures_iter(text) {
            pairs.push((caps[2].trim().to_string(), strip_article(&caps[1])));
        }

        let mut chunks = Vec::new();
        for (term, definition) in pairs {
            if term.is_empty() || !seen.insert(&term) {
                continue;
            }
            let index = chunks.len();
            chunks.push(Self::definition_chunk(
                ctx,
                ids,
                section,
                page,
                page,
                index,
                &term,
                &definition,
            ));
        }
        chunks
    }
}

fn strip_article(term: &str) -> String {
    LEADING_ARTICLE.replace(term.trim(), "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::super::test_support::section;
    use super::super::IdScheme;
    use super::*;

    fn fixtures() -> (ChunkContext<'static>, ChunkIds, SeenTerms) {
        (
            ChunkContext::new("JESD84-B51.pdf", "5.1"),
            ChunkIds::new(IdScheme::Deterministic, "JESD84-B51.pdf"),
            SeenTerms::new(),
        )
    }

    #[test]
    fn test_definition_section_titles() {
        assert!(is_definition_section_title(" Terms and definitions "));
        assert!(is_definition_section_title("Acronyms"));
        assert!(is_definition_section_title("Definitions"));
        assert!(is_definition_section_title("Abbreviations and acronyms"));
        // Exact titles only
        assert!(!is_definition_section_title("Terms used in this document"));
    }

    #[test]
    fn test_abbreviations_round_one() {
        let (ctx, mut ids, mut seen) = fixtures();
        let node = section("3.2", "Abbreviation");
        let text = "ACMD: Application specific command\nCRC - Cyclic redundancy check\nshort: x";
        let chunks = DefinitionChunker::new().extract_from_section(&ctx, &mut ids, &mut seen, text, &node);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].term.as_deref(), Some("ACMD"));
        assert_eq!(chunks[0].raw_text, "ACMD: Application specific command");
        assert_eq!(chunks[1].term.as_deref(), Some("CRC"));
        assert_eq!(chunks[1].chunk_index, 1);
        assert_eq!(chunks[1].page_start, node.page_start);
        assert_eq!(chunks[1].page_end, node.page_end);
        assert!(!chunks[0].is_front_matter);
        assert!(seen.contains("acmd"));
    }

    #[test]
    fn test_round_one_skips_seen_terms() {
        let (ctx, mut ids, mut seen) = fixtures();
        let chunker = DefinitionChunker::new();
        let first = section("3.2", "Abbreviations");
        let text = "CRC: Cyclic redundancy check code";
        assert_eq!(chunker.extract_from_section(&ctx, &mut ids, &mut seen, text, &first).len(), 1);

        let second = section("B.1", "Acronyms");
        let text = "CRC - Cyclic redundancy check, annex form\nDAT0: Data line zero of the bus";
        let chunks = chunker.extract_from_section(&ctx, &mut ids, &mut seen, text, &second);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].term.as_deref(), Some("DAT0"));
        assert_eq!(chunks[0].chunk_index, 0);
    }

    #[test]
    fn test_numbered_entries_when_no_abbreviations() {
        let (ctx, mut ids, mut seen) = fixtures();
        let node = section("3", "Terms and definitions");
        let text = "3.1.1 Boot partition\nA dedicated area of the device used for booting.";
        let chunks = DefinitionChunker::new().extract_from_section(&ctx, &mut ids, &mut seen, text, &node);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].term.as_deref(), Some("Boot partition"));
    }

    #[test]
    fn test_non_definition_section_ignored() {
        let (ctx, mut ids, mut seen) = fixtures();
        let node = section("6", "General");
        let text = "ACMD: Application specific command";
        assert!(DefinitionChunker::new()
            .extract_from_section(&ctx, &mut ids, &mut seen, text, &node)
            .is_empty());
    }

    #[test]
    fn test_inline_definitions_deduplicated() {
        let (ctx, mut ids, mut seen) = fixtures();
        let chunker = DefinitionChunker::new();
        let text = "The Boot area means the partition read at power-up by the host.";
        let first = chunker.extract_inline(&ctx, &mut ids, &mut seen, text, None, 30);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].term.as_deref(), Some("Boot area"));
        assert_eq!(first[0].page_start, 30);

        let again = chunker.extract_inline(&ctx, &mut ids, &mut seen, "the boot area means something else entirely", None, 31);
        assert!(again.is_empty());
    }

    #[test]
    fn test_inline_abbreviation_term_is_short_form() {
        let (ctx, mut ids, mut seen) = fixtures();
        let text = "Replay Protected Memory Block (abbreviated as RPMB) is used for keys.";
        let chunks = DefinitionChunker::new().extract_inline(&ctx, &mut ids, &mut seen, text, None, 5);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].term.as_deref(), Some("RPMB"));
        assert_eq!(chunks[0].raw_text, "RPMB: Replay Protected Memory Block");
    }
}
