//! Ingestion result with the searchable view and statistics.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{Chunk, ContentType, DocumentStructure};

use super::filter::{is_searchable, is_valid_chunk};
use super::IngestOptions;

/// Everything one pipeline run produced for a document.
#[derive(Debug, Clone)]
pub struct IngestionResult {
    /// Source identifier, usually the file name
    pub source: String,

    /// Document revision
    pub version: String,

    /// Page count of the document
    pub total_pages: u32,

    /// Resolved section hierarchy
    pub structure: DocumentStructure,

    chunks: Vec<Chunk>,
    searchable: Vec<bool>,
}

impl IngestionResult {
    /// Wrap a run's chunks, deciding searchability once.
    pub fn new(
        source: impl Into<String>,
        version: impl Into<String>,
        total_pages: u32,
        structure: DocumentStructure,
        chunks: Vec<Chunk>,
        options: &IngestOptions,
    ) -> Self {
        let searchable = chunks.iter().map(|c| is_searchable(c, options)).collect();
        Self {
            source: source.into(),
            version: version.into(),
            total_pages,
            structure,
            chunks,
            searchable,
        }
    }

    /// All chunks in creation order, including filtered ones.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Chunks that belong in the retrieval index.
    pub fn searchable_chunks(&self) -> Vec<&Chunk> {
        self.chunks
            .iter()
            .zip(&self.searchable)
            .filter_map(|(chunk, &keep)| keep.then_some(chunk))
            .collect()
    }

    pub fn into_chunks(self) -> Vec<Chunk> {
        self.chunks
    }

    pub fn stats(&self) -> IngestionStats {
        let mut by_type = BTreeMap::new();
        for chunk in self.searchable_chunks() {
            *by_type.entry(chunk.content_type).or_insert(0) += 1;
        }
        IngestionStats {
            total: self.chunks.len(),
            searchable: self.searchable.iter().filter(|&&s| s).count(),
            front_matter: self.chunks.iter().filter(|c| c.is_front_matter).count(),
            short_filtered: self
                .chunks
                .iter()
                .filter(|c| !c.is_front_matter && !is_valid_chunk(c))
                .count(),
            by_type,
        }
    }
}

/// Chunk counts of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionStats {
    /// All chunks produced
    pub total: usize,

    /// Chunks in the searchable view
    pub searchable: usize,

    /// Chunks attributed to front matter
    pub front_matter: usize,

    /// Body chunks failing the length or noise checks
    pub short_filtered: usize,

    /// Searchable chunks per content type
    pub by_type: BTreeMap<ContentType, usize>,
}

impl IngestionStats {
    /// Searchable count for one content type.
    pub fn count(&self, content_type: ContentType) -> usize {
        self.by_type.get(&content_type).copied().unwrap_or(0)
    }
}

impl fmt::Display for IngestionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total={} searchable={} front_matter={} short_filtered={}",
            self.total, self.searchable, self.front_matter, self.short_filtered
        )?;
        for (content_type, count) in &self.by_type {
            write!(f, " {}={}", content_type, count)?;
        }
        Ok(())
    }
}
