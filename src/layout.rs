//! Placement and reference page geometry
//!
//! All coordinates are PDF user-space points (1/72 inch) with the origin at
//! the bottom-left corner of the page.

use crate::error::{Error, Result};

/// Page dimensions in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageDimensions {
    pub width: f64,
    pub height: f64,
}

impl PageDimensions {
    /// US Letter size (8.5" × 11")
    pub const fn letter() -> Self {
        Self {
            width: 612.0,
            height: 792.0,
        }
    }

    /// MediaBox array for this page size
    pub fn media_box(&self) -> [f64; 4] {
        [0.0, 0.0, self.width, self.height]
    }
}

/// Reference frame every overlay is rendered against, regardless of the
/// source page's own MediaBox
pub const REFERENCE_PAGE: PageDimensions = PageDimensions::letter();

/// Where and how large the signature is drawn
///
/// `x`/`y` locate the image's bottom-left corner. They may be negative or lie
/// outside the page; nothing is clipped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            x: 380.0,
            y: 180.0,
            scale: 0.45,
        }
    }
}

impl Placement {
    /// Create a validated placement
    pub fn new(x: f64, y: f64, scale: f64) -> Result<Self> {
        let placement = Self { x, y, scale };
        placement.validate()?;
        Ok(placement)
    }

    /// Reject non-finite coordinates and non-positive scale factors
    pub fn validate(&self) -> Result<()> {
        if !self.x.is_finite() || !self.y.is_finite() {
            return Err(Error::Validation(format!(
                "position must be finite, got ({}, {})",
                self.x, self.y
            )));
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(Error::Validation(format!(
                "scale factor must be greater than zero, got {}",
                self.scale
            )));
        }
        Ok(())
    }

    /// Drawn size of an image with the given native pixel dimensions
    ///
    /// One pixel maps to one point before scaling.
    pub fn effective_size(&self, width_px: u32, height_px: u32) -> (f64, f64) {
        (
            f64::from(width_px) * self.scale,
            f64::from(height_px) * self.scale,
        )
    }
}
