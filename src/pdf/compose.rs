//! Stamping an overlay onto selected pages of a PDF
//!
//! The overlay page is imported as a Form XObject and invoked from a content
//! stream appended to each selected page. Existing streams are never
//! rewritten: the original page content is bracketed by two small `q`/`Q`
//! streams so state it leaves behind (an unbalanced `cm`, a clip) cannot move
//! or hide the signature. Pages that are not selected, and everything outside
//! the page tree (Info, Outlines, names, fonts), are left exactly as loaded.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use log::{debug, info};
use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::pages::PageSpec;
use crate::pdf::overlay::OverlayFragment;

/// Base resource name under which the overlay is installed on a page
const STAMP_NAME: &str = "SigStamp";

/// Outcome of stamping one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StampSummary {
    /// Pages in the source document
    pub page_count: usize,
    /// 1-based page numbers that received the overlay
    pub stamped_pages: Vec<u32>,
}

/// Load a PDF from memory, rejecting encrypted and structurally broken files
pub fn load_document(bytes: &[u8]) -> Result<Document> {
    let doc = Document::load_mem(bytes)?;

    if doc.is_encrypted() {
        return Err(Error::InvalidDocument {
            path: None,
            reason: "encrypted documents are not supported".to_string(),
        });
    }

    doc.catalog()?;
    Ok(doc)
}

/// Stamp `fragment` onto every page of `source` selected by `pages`
///
/// Returns the bytes of a complete new document. Selected page numbers past
/// the end of the document match nothing.
pub fn compose(source: &[u8], fragment: &OverlayFragment, pages: &PageSpec) -> Result<Vec<u8>> {
    let mut doc = load_document(source)?;
    stamp_document(&mut doc, fragment, pages)?;

    let mut output = Vec::new();
    doc.save_to(&mut output)?;
    Ok(output)
}

/// Stamp a loaded document in place
pub fn stamp_document(
    doc: &mut Document,
    fragment: &OverlayFragment,
    pages: &PageSpec,
) -> Result<StampSummary> {
    let page_ids: BTreeMap<u32, ObjectId> = doc.get_pages();
    let page_count = page_ids.len();

    let targets: Vec<(u32, ObjectId)> = page_ids
        .into_iter()
        .filter(|(number, _)| pages.contains(*number))
        .collect();

    if targets.is_empty() {
        debug!("no selected page among {} pages, document left unchanged", page_count);
        return Ok(StampSummary {
            page_count,
            stamped_pages: Vec::new(),
        });
    }

    let form_id = import_overlay(doc, fragment)?;

    // Shared by every stamped page; they only save and restore graphics state
    let open_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    // Leading newline: the preceding stream may not end in whitespace
    let close_id = doc.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));

    let mut stamped_pages = Vec::with_capacity(targets.len());
    for (number, page_id) in targets {
        let name = install_form_resource(doc, page_id, form_id)?;

        let invoke = format!("q\n/{} Do\nQ\n", name);
        let invoke_id = doc.add_object(Stream::new(Dictionary::new(), invoke.into_bytes()));

        wrap_and_append_content(doc, page_id, open_id, close_id, invoke_id)?;
        debug!("stamped page {} as /{}", number, name);
        stamped_pages.push(number);
    }

    Ok(StampSummary {
        page_count,
        stamped_pages,
    })
}

/// Stamp `input` and write the result to `output`
///
/// The output is written to a temporary file in the destination folder and
/// renamed into place, so a failure never leaves a partial file behind.
pub fn stamp_file(
    input: &Path,
    output: &Path,
    fragment: &OverlayFragment,
    pages: &PageSpec,
) -> Result<StampSummary> {
    if !input.exists() {
        return Err(Error::FileNotFound(input.to_path_buf()));
    }
    if same_file(input, output) {
        return Err(Error::Validation(format!(
            "refusing to overwrite source {}",
            input.display()
        )));
    }

    let bytes = std::fs::read(input)?;
    let mut doc = load_document(&bytes).map_err(|e| e.with_path(input))?;
    let summary = stamp_document(&mut doc, fragment, pages).map_err(|e| e.with_path(input))?;

    let mut rendered = Vec::new();
    doc.save_to(&mut rendered)?;
    write_atomically(output, &rendered)?;

    info!(
        "wrote {} ({} of {} pages stamped)",
        output.display(),
        summary.stamped_pages.len(),
        summary.page_count
    );
    Ok(summary)
}

/// Sibling output path for `input`: `dir/<prefix><file name>`
pub fn signed_path(input: &Path, prefix: &str) -> Result<PathBuf> {
    let file_name = input
        .file_name()
        .ok_or_else(|| Error::Validation(format!("{} has no file name", input.display())))?;

    let mut name = std::ffi::OsString::from(prefix);
    name.push(file_name);
    Ok(input.with_file_name(name))
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn write_atomically(output: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(output).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

/// Copy the overlay's image objects into `doc` and wrap its page as a Form XObject
fn import_overlay(doc: &mut Document, fragment: &OverlayFragment) -> Result<ObjectId> {
    let source = fragment.document();
    let resources = Object::Dictionary(fragment.resources()?.clone());

    let mut reachable = BTreeSet::new();
    collect_references(source, &resources, &mut reachable);

    let mut id_map: HashMap<ObjectId, ObjectId> = HashMap::new();
    for old_id in &reachable {
        id_map.insert(*old_id, doc.new_object_id());
    }

    for old_id in &reachable {
        let object = source.get_object(*old_id)?;
        doc.objects
            .insert(id_map[old_id], renumber_object_references(object, &id_map));
    }

    let resources = renumber_object_references(&resources, &id_map);
    let bounds = fragment.bounds();
    let frame = fragment.frame();

    // Grow the BBox to the signature so off-frame placements are not clipped
    let bbox = [
        bounds.x.min(0.0),
        bounds.y.min(0.0),
        (bounds.x + bounds.width).max(frame.width),
        (bounds.y + bounds.height).max(frame.height),
    ];

    let form_dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Form",
        "FormType" => 1,
        "BBox" => bbox.iter().map(|&v| Object::Real(v as f32)).collect::<Vec<_>>(),
        "Matrix" => [1, 0, 0, 1, 0, 0].iter().map(|&v| Object::Integer(v)).collect::<Vec<_>>(),
        "Resources" => resources,
    };

    let form_id = doc.add_object(Stream::new(form_dict, fragment.content()?));
    Ok(form_id)
}

/// Collect every object id reachable from `object`
fn collect_references(doc: &Document, object: &Object, seen: &mut BTreeSet<ObjectId>) {
    match object {
        Object::Reference(id) => {
            if seen.insert(*id) {
                if let Ok(target) = doc.get_object(*id) {
                    collect_references(doc, target, seen);
                }
            }
        }
        Object::Array(items) => {
            for item in items {
                collect_references(doc, item, seen);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter() {
                collect_references(doc, value, seen);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter() {
                collect_references(doc, value, seen);
            }
        }
        _ => {}
    }
}

/// Renumber all object references in an object
fn renumber_object_references(object: &Object, id_map: &HashMap<ObjectId, ObjectId>) -> Object {
    match object {
        Object::Reference(old_id) => Object::Reference(*id_map.get(old_id).unwrap_or(old_id)),
        Object::Array(arr) => Object::Array(
            arr.iter()
                .map(|obj| renumber_object_references(obj, id_map))
                .collect(),
        ),
        Object::Dictionary(dict) => Object::Dictionary(renumber_dictionary(dict, id_map)),
        Object::Stream(stream) => {
            let mut stream = stream.clone();
            stream.dict = renumber_dictionary(&stream.dict, id_map);
            Object::Stream(stream)
        }
        _ => object.clone(),
    }
}

fn renumber_dictionary(dict: &Dictionary, id_map: &HashMap<ObjectId, ObjectId>) -> Dictionary {
    let mut new_dict = Dictionary::new();
    for (key, value) in dict.iter() {
        new_dict.set(key.clone(), renumber_object_references(value, id_map));
    }
    new_dict
}

/// Resolve a possibly indirect dictionary
fn resolve_dict(doc: &Document, object: &Object) -> Option<Dictionary> {
    match object {
        Object::Dictionary(dict) => Some(dict.clone()),
        Object::Reference(id) => match doc.get_object(*id) {
            Ok(Object::Dictionary(dict)) => Some(dict.clone()),
            _ => None,
        },
        _ => None,
    }
}

/// The page's Resources, following inheritance through ancestor Pages nodes
fn effective_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let mut node_id = page_id;
    // Bounded walk; a cyclic Parent chain must not hang us
    for _ in 0..64 {
        let node = doc.get_object(node_id)?.as_dict()?;
        if let Some(resources) = node.get(b"Resources").ok().and_then(|r| resolve_dict(doc, r)) {
            return Ok(resources);
        }
        match node.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => node_id = *parent_id,
            _ => break,
        }
    }
    Ok(Dictionary::new())
}

/// Register `form_id` in the page's XObject resources under a fresh name
///
/// The page receives its own inline copy of its effective Resources, so
/// resources shared with other pages (directly or by inheritance) are not
/// modified.
fn install_form_resource(doc: &mut Document, page_id: ObjectId, form_id: ObjectId) -> Result<String> {
    let mut resources = effective_resources(doc, page_id)?;

    let mut xobjects = resources
        .get(b"XObject")
        .ok()
        .and_then(|x| resolve_dict(doc, x))
        .unwrap_or_else(Dictionary::new);

    let name = unique_resource_name(&xobjects, STAMP_NAME);
    xobjects.set(name.clone(), Object::Reference(form_id));
    resources.set("XObject", Object::Dictionary(xobjects));

    let page_dict = doc.get_object_mut(page_id)?.as_dict_mut()?;
    page_dict.set("Resources", Object::Dictionary(resources));

    Ok(name)
}

fn unique_resource_name(existing: &Dictionary, base: &str) -> String {
    if !existing.has(base.as_bytes()) {
        return base.to_string();
    }
    // A dictionary with n entries leaves at least one of n + 1 suffixes free
    let mut n = 1usize;
    loop {
        let candidate = format!("{}{}", base, n);
        if !existing.has(candidate.as_bytes()) {
            return candidate;
        }
        n += 1;
    }
}

/// Rewrite the page's Contents as `[q, original..., Q, overlay]`
fn wrap_and_append_content(
    doc: &mut Document,
    page_id: ObjectId,
    open_id: ObjectId,
    close_id: ObjectId,
    invoke_id: ObjectId,
) -> Result<()> {
    let existing: Vec<Object> = {
        let page_dict = doc.get_object(page_id)?.as_dict()?;
        match page_dict.get(b"Contents") {
            Ok(Object::Reference(id)) => match doc.get_object(*id) {
                // Contents may point at an indirect array of streams
                Ok(Object::Array(arr)) => arr.clone(),
                _ => vec![Object::Reference(*id)],
            },
            Ok(Object::Array(arr)) => arr.clone(),
            _ => Vec::new(),
        }
    };

    let mut contents = Vec::with_capacity(existing.len() + 3);
    if !existing.is_empty() {
        contents.push(Object::Reference(open_id));
        contents.extend(existing);
        contents.push(Object::Reference(close_id));
    }
    contents.push(Object::Reference(invoke_id));

    let page_dict = doc.get_object_mut(page_id)?.as_dict_mut()?;
    page_dict.set("Contents", Object::Array(contents));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_path() {
        let path = signed_path(Path::new("/tmp/docs/report.pdf"), "signed_").unwrap();
        assert_eq!(path, Path::new("/tmp/docs/signed_report.pdf"));

        let path = signed_path(Path::new("plain.pdf"), "signed_").unwrap();
        assert_eq!(path, Path::new("signed_plain.pdf"));
    }

    #[test]
    fn test_signed_path_without_file_name() {
        assert!(matches!(
            signed_path(Path::new("/"), "signed_"),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_unique_resource_name() {
        let mut existing = Dictionary::new();
        assert_eq!(unique_resource_name(&existing, "SigStamp"), "SigStamp");

        existing.set("SigStamp", Object::Null);
        existing.set("SigStamp1", Object::Null);
        assert_eq!(unique_resource_name(&existing, "SigStamp"), "SigStamp2");
    }

    #[test]
    fn test_renumber_object_references() {
        let mut id_map = HashMap::new();
        id_map.insert((1, 0), (10, 0));

        let object = Object::Dictionary(dictionary! {
            "A" => Object::Reference((1, 0)),
            "B" => vec![Object::Reference((1, 0)), Object::Reference((2, 0))],
        });
        let renumbered = renumber_object_references(&object, &id_map);
        let dict = renumbered.as_dict().unwrap();

        assert_eq!(dict.get(b"A").unwrap().as_reference().unwrap(), (10, 0));
        let b = dict.get(b"B").unwrap().as_array().unwrap();
        assert_eq!(b[0].as_reference().unwrap(), (10, 0));
        assert_eq!(b[1].as_reference().unwrap(), (2, 0));
    }

    #[test]
    fn test_load_document_rejects_garbage() {
        let result = load_document(b"%PDF-1.4\nthis is not really a pdf");
        assert!(matches!(result, Err(Error::InvalidDocument { .. })));
    }

    #[test]
    fn test_stamp_file_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.pdf");
        let output = dir.path().join("signed_missing.pdf");

        let image = {
            use image::{DynamicImage, ImageFormat, RgbImage};
            let mut bytes = Vec::new();
            DynamicImage::ImageRgb8(RgbImage::new(2, 2))
                .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
                .unwrap();
            crate::pdf::SignatureImage::from_bytes(&bytes).unwrap()
        };
        let fragment =
            crate::pdf::render_overlay(&image, &crate::layout::Placement::default()).unwrap();
        let pages = PageSpec::parse("1").unwrap();

        let result = stamp_file(&missing, &output, &fragment, &pages);
        assert!(matches!(result, Err(Error::FileNotFound(_))));
        assert!(!output.exists());
    }
}
