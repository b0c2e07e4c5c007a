//! Page extraction: PDF access, content interpretation, layout, tables and drawings.

pub mod backend;
mod cleanup;
mod content;
mod drawings;
mod extractor;
mod layout;
mod lattice;
mod options;
mod outline;
mod source;
mod table_detector;
mod tables;

pub use backend::{LopdfBackend, PageBox, PageId, PdfBackend};
pub use cleanup::{CleanupOptions, CleanupPipeline};
pub use content::{ContentInterpreter, PageContent, TextRun};
pub use drawings::cluster_drawings;
pub use extractor::{GeometryBackend, PageExtractor, TableBackend, TableLayer};
pub use lattice::{Edge, LatticeConfig, LatticeFinder, Orientation};
pub use layout::{LayoutAnalyzer, LayoutConfig, TextBlock, TextLine, Word};
pub use options::{ErrorMode, ExtractOptions};
pub use source::{MemorySource, PageSource};
pub use table_detector::{DetectedTable, TableDetector, TableDetectorConfig};
pub use tables::{is_heading_decorated, is_plausible, TableExtractor};
