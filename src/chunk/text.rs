//! Section-scoped recursive text splitting.

use std::collections::VecDeque;

use crate::model::{Chunk, ContentType, SectionNode};

use super::{ChunkContext, ChunkIds};

/// Separators from coarsest to finest: paragraph, line, sentence, word, character.
pub const DEFAULT_SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Recursive character splitter.
///
/// Text is cut at the coarsest separator it contains; pieces still longer
/// than the target are cut again with the next finer separator. Adjacent
/// pieces are then packed into chunks of at most `chunk_size` characters,
/// carrying up to `chunk_overlap` characters of trailing context into the
/// next chunk. Separators stay attached to the start of the piece they
/// precede; every chunk is trimmed.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_separators(mut self, separators: &[&str]) -> Self {
        self.separators = separators.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        let separators: Vec<&str> = self.separators.iter().map(String::as_str).collect();
        self.split_recursive(text, &separators)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let mut separator = separators.last().copied().unwrap_or("");
        let mut finer: &[&str] = &[];
        for (i, &candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = candidate;
                break;
            }
            if text.contains(candidate) {
                separator = candidate;
                finer = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();
        for piece in split_keep_start(text, separator) {
            if char_len(piece) < self.chunk_size {
                pending.push(piece);
                continue;
            }
            if !pending.is_empty() {
                chunks.extend(self.merge(&pending));
                pending.clear();
            }
            if finer.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split_recursive(piece, finer));
            }
        }
        if !pending.is_empty() {
            chunks.extend(self.merge(&pending));
        }
        chunks
    }

    /// Pack pieces into chunks with overlap.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut docs = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !window.is_empty() {
                if let Some(doc) = join_trimmed(&window) {
                    docs.push(doc);
                }
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match window.pop_front() {
                        Some(front) => total -= char_len(front),
                        None => break,
                    }
                }
            }
            window.push_back(piece);
            total += len;
        }

        if let Some(doc) = join_trimmed(&window) {
            docs.push(doc);
        }
        docs
    }
}

/// Split on `separator`, keeping each separator at the start of the following
/// piece; an empty separator splits into characters. Empty pieces are dropped.
fn split_keep_start<'t>(text: &'t str, separator: &str) -> Vec<&'t str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (at, _) in text.match_indices(separator) {
        if at > start {
            pieces.push(&text[start..at]);
        }
        start = at;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces.retain(|p| !p.is_empty());
    pieces
}

fn join_trimmed(pieces: &VecDeque<&str>) -> Option<String> {
    let joined: String = pieces.iter().copied().collect();
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Chunks running text and register descriptions.
#[derive(Debug, Clone)]
pub struct TextChunker {
    splitter: TextSplitter,
    /// Register text up to this many characters stays in one chunk
    register_atomic_chars: usize,
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new(2800, 400, 1.5)
    }
}

impl TextChunker {
    pub fn new(chunk_chars: usize, chunk_overlap: usize, register_atomic_factor: f32) -> Self {
        Self {
            splitter: TextSplitter::new(chunk_chars, chunk_overlap),
            register_atomic_chars: (chunk_chars as f32 * register_atomic_factor) as usize,
        }
    }

    /// Split one section's accumulated text into chunks.
    #[allow(clippy::too_many_arguments)]
    pub fn chunk_section(
        &self,
        ctx: &ChunkContext<'_>,
        ids: &mut ChunkIds,
        raw_text: &str,
        section: Option<&SectionNode>,
        page_start: u32,
        page_end: u32,
        content_type: ContentType,
    ) -> Vec<Chunk> {
        if raw_text.trim().is_empty() {
            return Vec::new();
        }
        let prefix = format!("{}\n", ctx.header(section, page_start));

        if content_type == ContentType::Register && char_len(raw_text) <= self.register_atomic_chars {
            return vec![ctx.chunk(
                ids,
                section,
                content_type,
                page_start,
                page_end,
                0,
                &prefix,
                raw_text.to_string(),
            )];
        }

        self.splitter
            .split(raw_text)
            .into_iter()
            .enumerate()
            .map(|(index, piece)| {
                ctx.chunk(ids, section, content_type, page_start, page_end, index, &prefix, piece)
            })
            .collect()
    }
}
