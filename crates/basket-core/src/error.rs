//! Error types for the basket-core library.

use thiserror::Error;

/// Main error type for the basket library.
///
/// Every variant is fatal for the document being processed. Row and cell
/// problems never surface here; they are counted in a
/// [`SkipReport`](crate::table::SkipReport) instead.
#[derive(Error, Debug)]
pub enum BasketError {
    /// The PDF bytes could not be read as a text document.
    #[error("document unreadable: {0}")]
    DocumentUnreadable(#[from] PdfError),

    /// No candidate table matched the signature.
    #[error("classification failed: {0}")]
    Classification(#[from] ClassifyError),

    /// The selected table could not be normalized.
    #[error("normalization failed: {0}")]
    Extraction(#[from] ExtractionError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse failure reason, suitable for summaries and exit reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    DocumentUnreadable,
    NoMatchingTable,
    UnrecognizedSchema,
    Config,
    Io,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::DocumentUnreadable => "document_unreadable",
            FailureKind::NoMatchingTable => "no_matching_table",
            FailureKind::UnrecognizedSchema => "unrecognized_schema",
            FailureKind::Config => "config",
            FailureKind::Io => "io",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl BasketError {
    /// Classify this error into a coarse failure reason.
    pub fn kind(&self) -> FailureKind {
        match self {
            BasketError::DocumentUnreadable(_) => FailureKind::DocumentUnreadable,
            BasketError::Classification(_) => FailureKind::NoMatchingTable,
            BasketError::Extraction(_) => FailureKind::UnrecognizedSchema,
            BasketError::Config(_) => FailureKind::Config,
            BasketError::Io(_) => FailureKind::Io,
        }
    }
}

/// Errors related to PDF processing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// No page carries extractable text (scanned or image-only document).
    #[error("PDF contains no extractable text")]
    NoText,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),
}

impl From<lopdf::Error> for PdfError {
    fn from(e: lopdf::Error) -> Self {
        PdfError::Parse(e.to_string())
    }
}

/// Errors related to target table selection.
#[derive(Error, Debug)]
pub enum ClassifyError {
    /// No candidate table cleared the signature.
    #[error("no matching table among {candidates} candidate(s): {reason}")]
    NoMatchingTable { candidates: usize, reason: String },
}

/// Errors related to record extraction from the selected table.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    /// Too few header cells map to canonical fields.
    #[error("unrecognized schema: {recognized} of {required} required columns recognized in header {header:?}")]
    UnrecognizedSchema {
        recognized: usize,
        required: usize,
        header: Vec<String>,
    },

    /// A price cell is not numeric after stripping currency and separators.
    #[error("malformed price: {0:?}")]
    MalformedPrice(String),

    /// A record violates a data invariant.
    #[error("invalid record ({field}): {reason}")]
    InvalidRecord { field: String, reason: String },
}

/// Result type for the basket library.
pub type Result<T> = std::result::Result<T, BasketError>;
