//! Error types for the PDF stamper library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while parsing a page selector
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PageSpecError {
    /// Empty or all-whitespace selector
    #[error("no pages selected")]
    EmptySelection,

    /// A token that is not a page number or a `start-end` range
    #[error("malformed page token: '{token}'")]
    MalformedToken { token: String },
}

/// Main error type for the PDF stamper library
#[derive(Error, Debug)]
pub enum Error {
    /// Placement or numeric input rejected before any file is touched
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Page selector could not be parsed
    #[error("Invalid page selection: {0}")]
    PageSelection(#[from] PageSpecError),

    /// Signature image unreadable or in an unsupported format
    #[error("Invalid signature image: {0}")]
    InvalidImage(String),

    /// Source PDF unreadable, corrupt or encrypted
    #[error("Invalid PDF{}: {reason}", path_suffix(.path))]
    InvalidDocument {
        path: Option<PathBuf>,
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Batch source is not a folder
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// Batch stopped before this file was processed
    #[error("Cancelled")]
    Cancelled,
}

fn path_suffix(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" {}", p.display()))
        .unwrap_or_default()
}

/// Coarse classification used in batch reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Parse,
    InvalidImage,
    InvalidDocument,
    Io,
    Cancelled,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Parse => "parse",
            ErrorKind::InvalidImage => "invalid image",
            ErrorKind::InvalidDocument => "invalid document",
            ErrorKind::Io => "io",
            ErrorKind::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

impl Error {
    /// Build an `InvalidDocument` error for a known file
    pub fn invalid_document(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::InvalidDocument {
            path: Some(path.into()),
            reason: reason.into(),
        }
    }

    /// Attach a path to an `InvalidDocument` error that was raised without one
    pub fn with_path(self, path: &std::path::Path) -> Self {
        match self {
            Error::InvalidDocument { path: None, reason } => Error::InvalidDocument {
                path: Some(path.to_path_buf()),
                reason,
            },
            other => other,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::PageSelection(_) => ErrorKind::Parse,
            Error::InvalidImage(_) => ErrorKind::InvalidImage,
            Error::InvalidDocument { .. } => ErrorKind::InvalidDocument,
            Error::Io(_) | Error::FileNotFound(_) | Error::NotADirectory(_) => ErrorKind::Io,
            Error::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Whether this error stops a whole batch rather than a single file
    ///
    /// Placement, page selection and the signature image are shared by every
    /// file, so a failure in any of them aborts before any PDF is opened.
    pub fn is_batch_fatal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Validation | ErrorKind::Parse | ErrorKind::InvalidImage
        )
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            other => Error::InvalidDocument {
                path: None,
                reason: other.to_string(),
            },
        }
    }
}
