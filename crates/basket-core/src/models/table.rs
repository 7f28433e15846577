//! Raw and classified table models.

use serde::{Deserialize, Serialize};

/// Where a table was found in its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Provenance {
    /// Page number (1-indexed).
    pub page: u32,
    /// Total pages in the document.
    pub page_count: u32,
    /// Index of the table on its page, top to bottom (0-based).
    pub index_on_page: usize,
    /// Index of the table in document order (0-based).
    pub ordinal: usize,
}

/// A detected grid of cell text.
///
/// Every row has the same number of columns; ragged rows are padded with
/// empty strings on construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    rows: Vec<Vec<String>>,
    /// Source location.
    pub provenance: Provenance,
    /// Page text above the table (title, captions).
    pub context: String,
}

impl RawTable {
    /// Create a table, padding ragged rows to the widest row.
    pub fn new(mut rows: Vec<Vec<String>>, provenance: Provenance) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(width, String::new());
        }
        Self {
            rows,
            provenance,
            context: String::new(),
        }
    }

    /// Attach the page text preceding the table.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[String]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_cols(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    /// Rows after `index` with at least one non-empty cell.
    pub fn non_blank_rows_after(&self, index: usize) -> usize {
        self.rows
            .iter()
            .skip(index + 1)
            .filter(|row| !is_blank_row(row))
            .count()
    }
}

/// Check whether every cell of a row is empty after trimming.
pub fn is_blank_row(row: &[String]) -> bool {
    row.iter().all(|c| c.trim().is_empty())
}

/// A raw table selected as the target, with its header position.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedTable {
    /// The selected table.
    pub table: RawTable,
    /// Classification score.
    pub score: f32,
    /// Index of the header row within the table.
    pub header_row: usize,
}

impl ClassifiedTable {
    pub fn header(&self) -> &[String] {
        self.table.row(self.header_row).unwrap_or(&[])
    }

    /// Rows strictly after the header row.
    pub fn body(&self) -> &[Vec<String>] {
        let start = (self.header_row + 1).min(self.table.num_rows());
        &self.table.rows()[start..]
    }
}
