//! Page extraction options and configuration.

use super::cleanup::CleanupOptions;
use super::lattice::LatticeConfig;
use super::layout::LayoutConfig;
use super::table_detector::TableDetectorConfig;

/// Options for the page extractor.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractOptions {
    /// Blocks ending above this distance from the top edge are running headers
    pub header_margin: f32,

    /// Blocks starting below `height - footer_margin` are running footers
    pub footer_margin: f32,

    /// Drawing clusters smaller than this area (pt²) are discarded
    pub min_figure_area: f32,

    /// Padding used when merging drawing primitives
    pub cluster_padding: f32,

    /// Ruled-line table thresholds
    pub table_settings: LatticeConfig,

    /// Text-alignment table fallback thresholds
    pub stream: TableDetectorConfig,

    /// Line and block grouping thresholds
    pub layout: LayoutConfig,

    /// Which cleanup stages run on block and cell text
    pub cleanup: CleanupOptions,

    /// Additional watermark patterns (regular expressions) to strip
    pub extra_watermarks: Vec<String>,

    /// Error handling mode for page-level failures
    pub error_mode: ErrorMode,
}

impl ExtractOptions {
    /// Create new extract options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the header and footer margin bands.
    pub fn with_margins(mut self, header: f32, footer: f32) -> Self {
        self.header_margin = header;
        self.footer_margin = footer;
        self
    }

    /// Set the minimum drawing cluster area.
    pub fn with_min_figure_area(mut self, area: f32) -> Self {
        self.min_figure_area = area;
        self
    }

    /// Set the drawing merge padding.
    pub fn with_cluster_padding(mut self, padding: f32) -> Self {
        self.cluster_padding = padding;
        self
    }

    /// Set the ruled-line table thresholds.
    pub fn with_table_settings(mut self, settings: LatticeConfig) -> Self {
        self.table_settings = settings;
        self
    }

    /// Set the text-alignment fallback thresholds.
    pub fn with_stream_settings(mut self, settings: TableDetectorConfig) -> Self {
        self.stream = settings;
        self
    }

    /// Set the layout grouping thresholds.
    pub fn with_layout(mut self, layout: LayoutConfig) -> Self {
        self.layout = layout;
        self
    }

    /// Set the cleanup stages.
    pub fn with_cleanup(mut self, cleanup: CleanupOptions) -> Self {
        self.cleanup = cleanup;
        self
    }

    /// Add a watermark pattern.
    pub fn with_watermark(mut self, pattern: impl Into<String>) -> Self {
        self.extra_watermarks.push(pattern.into());
        self
    }

    /// Set error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Abort on the first page-level extraction failure.
    pub fn strict(mut self) -> Self {
        self.error_mode = ErrorMode::Strict;
        self
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            header_margin: 60.0,
            footer_margin: 60.0,
            min_figure_area: 5000.0,
            cluster_padding: 4.0,
            table_settings: LatticeConfig::default(),
            stream: TableDetectorConfig::default(),
            layout: LayoutConfig::default(),
            cleanup: CleanupOptions::default(),
            extra_watermarks: Vec::new(),
            error_mode: ErrorMode::default(),
        }
    }
}

/// Error handling mode for page-level extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Log the failure and treat that extractor's output for the page as empty
    #[default]
    Lenient,
    /// Fail the whole document
    Strict,
}
