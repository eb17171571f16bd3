//! PDF Stamper Library
//!
//! A cross-platform library for stamping a raster signature onto PDF pages.
//! This library provides functionality to:
//! - Parse page selections such as `"1-3,7"`
//! - Render a PNG/JPEG signature onto a Letter-sized overlay
//! - Stamp the overlay onto selected pages, leaving everything else intact
//! - Process a whole folder of PDFs, collecting per-file failures
//!
//! The signature is a visual stamp only; nothing is cryptographically signed.
//!
//! # Example
//!
//! ```no_run
//! use pdf_stamper::layout::Placement;
//! use pdf_stamper::pages::PageSpec;
//! use pdf_stamper::pdf::{render_overlay, stamp_file, SignatureImage};
//! use std::path::Path;
//!
//! let image = SignatureImage::open(Path::new("signature.png")).expect("bad signature");
//! let fragment = render_overlay(&image, &Placement::new(380.0, 180.0, 0.45).unwrap())
//!     .expect("render failed");
//! let pages = PageSpec::parse("2").unwrap();
//!
//! stamp_file(
//!     Path::new("contract.pdf"),
//!     Path::new("signed_contract.pdf"),
//!     &fragment,
//!     &pages,
//! ).expect("Failed to stamp");
//! ```

pub mod batch;
pub mod error;
pub mod layout;
pub mod pages;
pub mod pdf;

// Re-export commonly used items
pub use error::{Error, ErrorKind, PageSpecError, Result};
pub use layout::Placement;
pub use pages::PageSpec;
