//! PDF manipulation module

pub mod compose;
pub mod metadata;
pub mod overlay;
pub mod signature;

// Re-export commonly used items
pub use compose::{compose, signed_path, stamp_document, stamp_file, StampSummary};
pub use metadata::{count_pages, extract_metadata, PdfMetadata};
pub use overlay::{render_overlay, OverlayFragment, Rect};
pub use signature::{ColorModel, SignatureImage};
