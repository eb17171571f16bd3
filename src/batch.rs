//! Folder-wide stamping
//!
//! Every PDF directly inside a folder is stamped with the same signature and
//! written next to its source as `signed_<name>`. A file that fails is
//! recorded and the run moves on; only problems with the shared inputs
//! (placement, page selection, signature image, folder) stop the batch, and
//! those are detected before any PDF is opened.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use glob::{MatchOptions, Pattern};
use log::{info, warn};
use rayon::prelude::*;

use crate::error::{Error, ErrorKind, Result};
use crate::layout::Placement;
use crate::pages::PageSpec;
use crate::pdf::{render_overlay, signed_path, stamp_file, SignatureImage, StampSummary};

/// Cooperative cancellation flag, checked before each file
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the batch to stop; files already in progress still finish
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What to stamp and where
#[derive(Debug, Clone)]
pub struct StampRequest {
    /// PNG or JPEG signature
    pub signature_path: PathBuf,
    /// Folder whose PDFs are stamped (not searched recursively)
    pub source_folder: PathBuf,
    pub placement: Placement,
    /// Page selector text, e.g. `"1-3,7"`
    pub pages: String,
}

/// Options for a batch run
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Prepended to each source file name to form the output name
    pub output_prefix: String,
    /// File name suffix that marks a document
    pub extension: String,
    /// Match `extension` ignoring ASCII case (`.PDF` as well as `.pdf`)
    pub case_insensitive_extension: bool,
    /// Worker threads; 1 processes files in order on the calling thread
    pub jobs: usize,
    pub cancel: Option<CancelToken>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            output_prefix: "signed_".to_string(),
            extension: ".pdf".to_string(),
            case_insensitive_extension: true,
            jobs: 1,
            cancel: None,
        }
    }
}

/// Result for one source file
#[derive(Debug)]
pub struct FileOutcome {
    pub input: PathBuf,
    pub result: Result<StampedFile>,
}

/// A successfully written output
#[derive(Debug, Clone)]
pub struct StampedFile {
    pub output: PathBuf,
    pub summary: StampSummary,
}

/// A failed file as reported to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub file_name: String,
    pub kind: ErrorKind,
    pub message: String,
}

/// Aggregate outcome of a batch, in file name order
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Paths of every output written
    pub fn outputs(&self) -> Vec<&Path> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(|s| s.output.as_path()))
            .collect()
    }

    pub fn failures(&self) -> Vec<FileFailure> {
        self.outcomes
            .iter()
            .filter_map(|o| {
                o.result.as_ref().err().map(|e| FileFailure {
                    file_name: file_name(&o.input),
                    kind: e.kind(),
                    message: e.to_string(),
                })
            })
            .collect()
    }
}

/// Stamp every PDF in `request.source_folder`
///
/// Returns `Err` only for batch-wide problems; per-file failures are in the
/// report.
///
/// # Example
///
/// ```no_run
/// use pdf_stamper::batch::{run, BatchOptions, StampRequest};
/// use pdf_stamper::layout::Placement;
/// use std::path::PathBuf;
///
/// let request = StampRequest {
///     signature_path: PathBuf::from("signature.png"),
///     source_folder: PathBuf::from("contracts"),
///     placement: Placement::default(),
///     pages: "2".to_string(),
/// };
///
/// let report = run(&request, &BatchOptions::default()).expect("batch aborted");
/// println!("{} signed, {} failed", report.succeeded(), report.failed());
/// ```
pub fn run(request: &StampRequest, options: &BatchOptions) -> Result<BatchReport> {
    request.placement.validate()?;
    let pages = PageSpec::parse(&request.pages)?;
    let image = SignatureImage::open(&request.signature_path)?;

    run_with_image(&image, &request.source_folder, &request.placement, &pages, options)
}

/// Stamp every PDF in `folder` with an already decoded signature
pub fn run_with_image(
    image: &SignatureImage,
    folder: &Path,
    placement: &Placement,
    pages: &PageSpec,
    options: &BatchOptions,
) -> Result<BatchReport> {
    placement.validate()?;
    if options.jobs == 0 {
        return Err(Error::Validation("jobs must be at least 1".to_string()));
    }

    let inputs = list_documents(folder, &options.extension, options.case_insensitive_extension)?;
    info!("stamping {} documents in {}", inputs.len(), folder.display());

    let process = |input: &PathBuf| process_file(input, image, placement, pages, options);

    let outcomes: Vec<FileOutcome> = if options.jobs == 1 {
        inputs.iter().map(process).collect()
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.jobs)
            .build()
            .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        pool.install(|| inputs.par_iter().map(process).collect())
    };

    let report = BatchReport { outcomes };
    info!(
        "batch finished: {} succeeded, {} failed",
        report.succeeded(),
        report.failed()
    );
    Ok(report)
}

fn process_file(
    input: &Path,
    image: &SignatureImage,
    placement: &Placement,
    pages: &PageSpec,
    options: &BatchOptions,
) -> FileOutcome {
    let result = if options.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
        Err(Error::Cancelled)
    } else {
        stamp_one(input, image, placement, pages, &options.output_prefix)
    };

    if let Err(ref e) = result {
        warn!("{}: {}", input.display(), e);
    }

    FileOutcome {
        input: input.to_path_buf(),
        result,
    }
}

fn stamp_one(
    input: &Path,
    image: &SignatureImage,
    placement: &Placement,
    pages: &PageSpec,
    prefix: &str,
) -> Result<StampedFile> {
    let output = signed_path(input, prefix)?;
    // A fresh fragment per document; nothing is shared between outputs
    let fragment = render_overlay(image, placement)?;
    let summary = stamp_file(input, &output, &fragment, pages)?;
    Ok(StampedFile { output, summary })
}

/// Regular files directly in `folder` whose name ends in `extension`, sorted
pub fn list_documents(folder: &Path, extension: &str, case_insensitive: bool) -> Result<Vec<PathBuf>> {
    if !folder.exists() {
        return Err(Error::FileNotFound(folder.to_path_buf()));
    }
    if !folder.is_dir() {
        return Err(Error::NotADirectory(folder.to_path_buf()));
    }

    let folder_str = folder
        .to_str()
        .ok_or_else(|| Error::Validation(format!("folder path is not UTF-8: {}", folder.display())))?;
    let pattern = format!(
        "{}/*{}",
        Pattern::escape(folder_str),
        Pattern::escape(extension)
    );
    let match_options = MatchOptions {
        case_sensitive: !case_insensitive,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };

    let entries = glob::glob_with(&pattern, match_options)
        .map_err(|e| Error::Validation(format!("invalid folder pattern: {}", e)))?;

    let mut documents = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() => documents.push(path),
            Ok(_) => {}
            Err(e) => warn!("skipping unreadable entry: {}", e),
        }
    }

    documents.sort();
    Ok(documents)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_list_documents_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        for name in ["b.pdf", "a.pdf", "C.PDF", "notes.txt", "pdf"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("nested.pdf")).unwrap();
        fs::write(dir.path().join("nested.pdf").join("inner.pdf"), b"x").unwrap();

        let names: Vec<String> = list_documents(dir.path(), ".pdf", true)
            .unwrap()
            .iter()
            .map(|p| file_name(p))
            .collect();
        assert_eq!(names, vec!["C.PDF", "a.pdf", "b.pdf"]);

        let names: Vec<String> = list_documents(dir.path(), ".pdf", false)
            .unwrap()
            .iter()
            .map(|p| file_name(p))
            .collect();
        assert_eq!(names, vec!["a.pdf", "b.pdf"]);
    }

    #[test]
    fn test_list_documents_folder_with_glob_characters() {
        let dir = TempDir::new().unwrap();
        let odd = dir.path().join("scans [2024]");
        fs::create_dir(&odd).unwrap();
        fs::write(odd.join("one.pdf"), b"x").unwrap();

        let found = list_documents(&odd, ".pdf", true).unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_list_documents_missing_folder() {
        assert!(matches!(
            list_documents(Path::new("no/such/folder"), ".pdf", true),
            Err(Error::FileNotFound(_))
        ));
    }

    #[test]
    fn test_list_documents_not_a_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.pdf");
        fs::write(&file, b"x").unwrap();
        assert!(matches!(
            list_documents(&file, ".pdf", true),
            Err(Error::NotADirectory(_))
        ));
    }

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_run_rejects_shared_inputs_before_touching_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.pdf"), b"not a pdf").unwrap();

        let mut request = StampRequest {
            signature_path: dir.path().join("missing.png"),
            source_folder: dir.path().to_path_buf(),
            placement: Placement::default(),
            pages: " ".to_string(),
        };
        let err = run(&request, &BatchOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);

        request.pages = "1".to_string();
        request.placement.scale = -1.0;
        let err = run(&request, &BatchOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        request.placement.scale = 1.0;
        let err = run(&request, &BatchOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidImage);

        assert!(!dir.path().join("signed_a.pdf").exists());
    }
}
