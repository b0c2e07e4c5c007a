//! Pipeline-wide ingestion options.

use crate::chunk::IdScheme;
use crate::parser::{ErrorMode, ExtractOptions};

/// Section title keywords whose full tables stay searchable.
pub const DEFAULT_REGISTER_MAP_KEYWORDS: [&str; 5] = ["CSD", "CID", "DSR", "OCR", "EXT_CSD"];

/// Options for an ingestion run.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOptions {
    /// Target text chunk size in characters
    pub chunk_chars: usize,

    /// Characters carried over between consecutive text chunks
    pub chunk_overlap: usize,

    /// Register text up to `chunk_chars * register_atomic_factor` stays whole
    pub register_atomic_factor: f32,

    /// Character budget of one full-table chunk
    pub max_table_chars: usize,

    /// Vertical window (points) searched for figure captions
    pub caption_search_margin: f32,

    /// Product name placed ahead of the version in context headers
    pub product_name: Option<String>,

    /// How chunk ids are generated
    pub id_scheme: IdScheme,

    /// Sections whose titles contain one of these (case-insensitive) keep
    /// their full-table chunks in the searchable view
    pub register_map_keywords: Vec<String>,

    /// Page extraction settings
    pub extract: ExtractOptions,
}

impl IngestOptions {
    /// Create new ingest options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the text chunk size and overlap.
    pub fn with_chunk_size(mut self, chars: usize, overlap: usize) -> Self {
        self.chunk_chars = chars;
        self.chunk_overlap = overlap;
        self
    }

    pub fn with_register_atomic_factor(mut self, factor: f32) -> Self {
        self.register_atomic_factor = factor;
        self
    }

    pub fn with_max_table_chars(mut self, chars: usize) -> Self {
        self.max_table_chars = chars;
        self
    }

    pub fn with_caption_search_margin(mut self, margin: f32) -> Self {
        self.caption_search_margin = margin;
        self
    }

    /// Set the product name shown in context headers.
    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.product_name = Some(product.into());
        self
    }

    pub fn with_id_scheme(mut self, scheme: IdScheme) -> Self {
        self.id_scheme = scheme;
        self
    }

    /// Use random (v4) chunk ids.
    pub fn random_ids(self) -> Self {
        self.with_id_scheme(IdScheme::Random)
    }

    /// Replace the register-map section keywords.
    pub fn with_register_map_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.register_map_keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_extract(mut self, extract: ExtractOptions) -> Self {
        self.extract = extract;
        self
    }

    /// Set how page-level extraction failures are handled.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.extract.error_mode = mode;
        self
    }

    /// Abort the document on the first page-level failure.
    pub fn strict(self) -> Self {
        self.with_error_mode(ErrorMode::Strict)
    }

    pub fn error_mode(&self) -> ErrorMode {
        self.extract.error_mode
    }

    /// Whether a section title names a register map section.
    pub fn is_register_map_section(&self, title: &str) -> bool {
        let upper = title.to_uppercase();
        self.register_map_keywords
            .iter()
            .any(|kw| upper.contains(&kw.to_uppercase()))
    }
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            chunk_chars: 2800,
            chunk_overlap: 400,
            register_atomic_factor: 1.5,
            max_table_chars: 6000,
            caption_search_margin: 40.0,
            product_name: None,
            id_scheme: IdScheme::Deterministic,
            register_map_keywords: DEFAULT_REGISTER_MAP_KEYWORDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            extract: ExtractOptions::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = IngestOptions::default();
        assert_eq!(opts.chunk_chars, 2800);
        assert_eq!(opts.chunk_overlap, 400);
        assert_eq!(opts.max_table_chars, 6000);
        assert_eq!(opts.id_scheme, IdScheme::Deterministic);
        assert_eq!(opts.error_mode(), ErrorMode::Lenient);
    }

    #[test]
    fn test_builder_chain() {
        let opts = IngestOptions::new()
            .with_chunk_size(1000, 100)
            .with_product("eMMC")
            .random_ids()
            .strict();
        assert_eq!(opts.chunk_chars, 1000);
        assert_eq!(opts.product_name.as_deref(), Some("eMMC"));
        assert_eq!(opts.id_scheme, IdScheme::Random);
        assert_eq!(opts.extract.error_mode, ErrorMode::Strict);
    }

    #[test]
    fn test_register_map_section() {
        let opts = IngestOptions::default();
        assert!(opts.is_register_map_section("Extended CSD register (ext_csd)"));
        assert!(opts.is_register_map_section("OCR register"));
        assert!(!opts.is_register_map_section("Bus timing"));
    }
}
