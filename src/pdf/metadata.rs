//! PDF metadata extraction

use std::path::Path;
use lopdf::{Document, Object};
use crate::error::{Error, Result};
use crate::pdf::compose::load_document;

/// PDF metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfMetadata {
    /// Number of pages in the PDF
    pub page_count: usize,
    /// Document title (if present)
    pub title: Option<String>,
    /// Document author (if present)
    pub author: Option<String>,
}

/// Extract metadata from a PDF file
pub fn extract_metadata(path: &Path) -> Result<PdfMetadata> {
    let doc = open(path)?;
    Ok(document_metadata(&doc))
}

/// Extract metadata from an already loaded document
pub fn document_metadata(doc: &Document) -> PdfMetadata {
    let mut title = None;
    let mut author = None;

    let info = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|info| match info {
            Object::Reference(id) => doc.get_object(*id).ok(),
            direct => Some(direct),
        })
        .and_then(|info| info.as_dict().ok());

    if let Some(info_dict) = info {
        title = info_dict.get(b"Title").ok().and_then(text_string);
        author = info_dict.get(b"Author").ok().and_then(text_string);
    }

    PdfMetadata {
        page_count: doc.get_pages().len(),
        title,
        author,
    }
}

/// Count the number of pages in a PDF file
///
/// A document without pages counts as zero rather than failing.
pub fn count_pages(path: &Path) -> Result<usize> {
    Ok(open(path)?.get_pages().len())
}

fn open(path: &Path) -> Result<Document> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    let bytes = std::fs::read(path)?;
    load_document(&bytes).map_err(|e| e.with_path(path))
}

/// Decode a PDF text string (UTF-16BE with BOM, otherwise byte-per-char)
fn text_string(object: &Object) -> Option<String> {
    let bytes = object.as_str().ok()?;

    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16(&units).ok();
    }

    match std::str::from_utf8(bytes) {
        Ok(s) => Some(s.to_string()),
        Err(_) => Some(bytes.iter().map(|&b| char::from(b)).collect()),
    }
}
