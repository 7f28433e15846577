//! PDF table scanning module.

mod content;
mod fonts;
mod layout;
mod scanner;

pub use content::{Matrix, TextFragment};
pub use layout::{TextCell, TextLine};
pub use scanner::{PdfTableScanner, TableScan};

use crate::error::PdfError;
use crate::models::table::RawTable;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Source of candidate tables from a document.
///
/// Fatal problems with the document as a whole fail `scan`; problems found
/// while walking pages surface as `Err` items of the returned iterator.
pub trait TableScanner {
    type Tables: Iterator<Item = Result<RawTable>>;

    /// Start scanning a document held in memory.
    fn scan(&self, data: &[u8]) -> Result<Self::Tables>;
}
