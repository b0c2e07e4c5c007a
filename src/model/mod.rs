//! Data model shared by extraction, structuring and chunking.
//!
//! Geometry is expressed in a top-left-origin page space so that text from
//! both extraction back-ends can be compared directly.

mod chunk;
mod geometry;
mod page;
mod section;

pub use chunk::{Chunk, ContentType};
pub use geometry::BBox;
pub use page::{is_filled, DrawingCluster, ImageBlock, PageModel, RawTable, TextSpan};
pub use section::{DocumentStructure, SectionId, SectionNode, TocEntry};
