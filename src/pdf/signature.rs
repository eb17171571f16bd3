//! Signature image decoding and embedding

use std::path::Path;

use image::{DynamicImage, ImageFormat};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use crate::error::{Error, Result};

/// Colour space of the embedded samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorModel {
    Gray,
    Rgb,
}

impl ColorModel {
    fn pdf_name(self) -> &'static str {
        match self {
            ColorModel::Gray => "DeviceGray",
            ColorModel::Rgb => "DeviceRGB",
        }
    }
}

/// A decoded PNG or JPEG signature
///
/// Samples are 8 bits per component. `alpha` is present only when the source
/// carries an alpha channel that is not fully opaque.
#[derive(Debug, Clone)]
pub struct SignatureImage {
    width: u32,
    height: u32,
    color: ColorModel,
    samples: Vec<u8>,
    alpha: Option<Vec<u8>>,
}

impl SignatureImage {
    /// Decode a signature from raw PNG or JPEG bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let format = image::guess_format(bytes)
            .map_err(|e| Error::InvalidImage(format!("unrecognised image data: {}", e)))?;
        if !matches!(format, ImageFormat::Png | ImageFormat::Jpeg) {
            return Err(Error::InvalidImage(format!(
                "unsupported format {:?}, expected PNG or JPEG",
                format
            )));
        }

        let decoded = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| Error::InvalidImage(e.to_string()))?;

        if decoded.width() == 0 || decoded.height() == 0 {
            return Err(Error::InvalidImage("image has no pixels".to_string()));
        }

        Ok(Self::from_dynamic(decoded))
    }

    /// Read and decode a signature file
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            Error::InvalidImage(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_bytes(&bytes)
    }

    fn from_dynamic(img: DynamicImage) -> Self {
        let (width, height) = (img.width(), img.height());
        let color_type = img.color();

        let color = if color_type.has_color() {
            ColorModel::Rgb
        } else {
            ColorModel::Gray
        };

        let alpha = if color_type.has_alpha() {
            let alpha: Vec<u8> = img.to_rgba8().pixels().map(|p| p[3]).collect();
            // A fully opaque alpha channel draws the same as no mask
            alpha.iter().any(|&a| a != u8::MAX).then_some(alpha)
        } else {
            None
        };

        let samples = match color {
            ColorModel::Rgb => img.to_rgb8().into_raw(),
            ColorModel::Gray => img.to_luma8().into_raw(),
        };

        Self {
            width,
            height,
            color,
            samples,
            alpha,
        }
    }

    /// Native width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Native height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn color(&self) -> ColorModel {
        self.color
    }

    /// Whether drawing will honour a soft mask
    pub fn has_alpha(&self) -> bool {
        self.alpha.is_some()
    }

    /// Add this image (and its soft mask, if any) to `doc` as an Image XObject
    pub fn embed(&self, doc: &mut Document) -> ObjectId {
        let mut image_dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(self.width),
            "Height" => i64::from(self.height),
            "ColorSpace" => self.color.pdf_name(),
            "BitsPerComponent" => 8,
        };

        if let Some(ref alpha) = self.alpha {
            let smask_id = doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => i64::from(self.width),
                    "Height" => i64::from(self.height),
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => 8,
                },
                alpha.clone(),
            ));
            image_dict.set("SMask", Object::Reference(smask_id));
        }

        doc.add_object(Stream::new(image_dict, self.samples.clone()))
    }
}
