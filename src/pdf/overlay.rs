//! Overlay rendering
//!
//! Builds a one-page, in-memory PDF on the US Letter reference frame with the
//! signature drawn at its placement. The compositor lifts the page's content
//! and resources out of this fragment and stamps them onto source pages.

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use crate::error::{Error, Result};
use crate::layout::{PageDimensions, Placement, REFERENCE_PAGE};
use crate::pdf::signature::SignatureImage;

/// Resource name of the signature image inside the fragment
const IMAGE_NAME: &str = "Sig";

/// Smallest drawn width or height that survives `format_number`
const MIN_DRAWN_SIZE: f64 = 0.0001;

/// Rectangle in points, origin bottom-left
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A rendered signature overlay
///
/// Each fragment owns its own objects; build a new one per output document
/// rather than sharing one across files.
#[derive(Debug)]
pub struct OverlayFragment {
    doc: Document,
    page_id: ObjectId,
    frame: PageDimensions,
    bounds: Rect,
}

/// Render `image` at `placement` on the Letter reference frame
///
/// # Example
///
/// ```no_run
/// use pdf_stamper::layout::Placement;
/// use pdf_stamper::pdf::{render_overlay, SignatureImage};
/// use std::path::Path;
///
/// let image = SignatureImage::open(Path::new("signature.png")).expect("bad image");
/// let fragment = render_overlay(&image, &Placement::default()).expect("render failed");
/// println!("{:?}", fragment.bounds());
/// ```
pub fn render_overlay(image: &SignatureImage, placement: &Placement) -> Result<OverlayFragment> {
    placement.validate()?;

    let (width, height) = placement.effective_size(image.width(), image.height());
    if width < MIN_DRAWN_SIZE || height < MIN_DRAWN_SIZE {
        return Err(Error::Validation(format!(
            "scale {} draws the {}x{} px signature at {} x {} pt, too small to render",
            placement.scale,
            image.width(),
            image.height(),
            width,
            height
        )));
    }
    let bounds = Rect {
        x: placement.x,
        y: placement.y,
        width,
        height,
    };
    let frame = REFERENCE_PAGE;

    let mut doc = Document::with_version("1.5");
    let image_id = image.embed(&mut doc);

    // Image space is the unit square; cm scales it to the drawn size
    let content = format!(
        "q\n{} 0 0 {} {} {} cm\n/{} Do\nQ\n",
        format_number(width),
        format_number(height),
        format_number(bounds.x),
        format_number(bounds.y),
        IMAGE_NAME,
    );
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

    let mut xobjects = Dictionary::new();
    xobjects.set(IMAGE_NAME, Object::Reference(image_id));
    let resources = dictionary! {
        "XObject" => Object::Dictionary(xobjects),
    };

    let pages_id = doc.new_object_id();
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => Object::Reference(pages_id),
        "MediaBox" => frame.media_box().iter().map(|&v| Object::Real(v as f32)).collect::<Vec<_>>(),
        "Contents" => Object::Reference(content_id),
        "Resources" => Object::Dictionary(resources),
    });

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![Object::Reference(page_id)],
        "Count" => 1,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    doc.compress();

    Ok(OverlayFragment {
        doc,
        page_id,
        frame,
        bounds,
    })
}

impl OverlayFragment {
    /// Where the signature lands, in reference-frame points
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// The page size the placement is expressed against
    pub fn frame(&self) -> PageDimensions {
        self.frame
    }

    /// The fragment's backing document
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Decoded content stream of the fragment page
    pub fn content(&self) -> Result<Vec<u8>> {
        Ok(self.doc.get_page_content(self.page_id)?)
    }

    /// Resources dictionary of the fragment page
    pub fn resources(&self) -> Result<&Dictionary> {
        let page = self.doc.get_object(self.page_id)?.as_dict()?;
        match page.get(b"Resources")? {
            Object::Dictionary(dict) => Ok(dict),
            _ => Err(Error::InvalidDocument {
                path: None,
                reason: "overlay page has no inline Resources".to_string(),
            }),
        }
    }

    /// Serialise the fragment as a standalone one-page PDF
    pub fn to_pdf_bytes(&self) -> Result<Vec<u8>> {
        let mut doc = self.doc.clone();
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)?;
        Ok(bytes)
    }
}

/// Format a coordinate for a content stream: at most 4 decimals, no trailing zeros
pub(crate) fn format_number(value: f64) -> String {
    let formatted = format!("{:.4}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}
