//! Document-level table scanning with lopdf.

use std::collections::VecDeque;

use lopdf::{Document, ObjectId};
use tracing::{debug, warn};

use super::content::{TextFragment, page_fragments};
use super::layout::{TextLine, build_grid, detect_regions, group_lines};
use super::{Result, TableScanner};
use crate::error::PdfError;
use crate::models::config::ScanConfig;
use crate::models::table::{Provenance, RawTable};

/// Table scanner for text-based PDFs.
#[derive(Debug, Clone, Default)]
pub struct PdfTableScanner {
    config: ScanConfig,
}

impl PdfTableScanner {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Parse a document, decrypting it when it only has an empty user password.
    pub fn load(&self, data: &[u8]) -> Result<Document> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");
        }

        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF with {} pages", page_count);
        Ok(doc)
    }

    /// Scan a single page (1-indexed) of a loaded document.
    pub fn scan_page(&self, doc: &Document, page: u32) -> Result<Vec<RawTable>> {
        let pages = doc.get_pages();
        let page_id = *pages.get(&page).ok_or(PdfError::InvalidPage(page))?;
        let fragments = page_fragments(doc, page_id, &self.config)?;
        Ok(tables_on_page(
            fragments,
            page,
            pages.len() as u32,
            0,
            &self.config,
        ))
    }
}

impl TableScanner for PdfTableScanner {
    type Tables = TableScan;

    fn scan(&self, data: &[u8]) -> Result<TableScan> {
        let doc = self.load(data)?;
        Ok(TableScan::new(doc, self.config.clone()))
    }
}

/// Lazy iterator over the tables of a document, in page order.
///
/// Pages are read one at a time as the iterator advances. A page whose
/// content cannot be decoded is logged and contributes no tables. When no
/// page yields any text the scan ends with [`PdfError::NoText`].
pub struct TableScan {
    doc: Document,
    pages: Vec<(u32, ObjectId)>,
    next_page: usize,
    pending: VecDeque<RawTable>,
    config: ScanConfig,
    ordinal: usize,
    saw_text: bool,
    finished: bool,
}

impl TableScan {
    fn new(doc: Document, config: ScanConfig) -> Self {
        let pages = doc.get_pages().into_iter().collect();
        Self {
            doc,
            pages,
            next_page: 0,
            pending: VecDeque::new(),
            config,
            ordinal: 0,
            saw_text: false,
            finished: false,
        }
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    fn scan_next_page(&mut self) {
        let (number, page_id) = self.pages[self.next_page];
        self.next_page += 1;

        let fragments = match page_fragments(&self.doc, page_id, &self.config) {
            Ok(fragments) => fragments,
            Err(e) => {
                warn!("Skipping page {}: {}", number, e);
                return;
            }
        };
        if !fragments.is_empty() {
            self.saw_text = true;
        }

        let tables = tables_on_page(fragments, number, self.page_count(), self.ordinal, &self.config);
        self.ordinal += tables.len();
        self.pending.extend(tables);
    }
}

impl Iterator for TableScan {
    type Item = Result<RawTable>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(table) = self.pending.pop_front() {
                return Some(Ok(table));
            }

            if self.next_page >= self.pages.len() {
                if self.finished {
                    return None;
                }
                self.finished = true;
                return (!self.saw_text).then_some(Err(PdfError::NoText));
            }

            self.scan_next_page();
        }
    }
}

fn tables_on_page(
    fragments: Vec<TextFragment>,
    page: u32,
    page_count: u32,
    first_ordinal: usize,
    config: &ScanConfig,
) -> Vec<RawTable> {
    let lines = group_lines(fragments, config);
    let regions = detect_regions(&lines, config);

    let mut tables = Vec::new();
    let mut context_start = 0;
    for region in regions {
        let context = context_text(&lines[context_start..region.start]);
        context_start = region.end;

        let Some(rows) = build_grid(&lines[region.clone()], config) else {
            continue;
        };

        let provenance = Provenance {
            page,
            page_count,
            index_on_page: tables.len(),
            ordinal: first_ordinal + tables.len(),
        };
        debug!(
            "Page {}: table {} with {} rows x {} columns",
            page,
            provenance.index_on_page,
            rows.len(),
            rows.first().map(Vec::len).unwrap_or(0)
        );
        tables.push(RawTable::new(rows, provenance).with_context(context));
    }

    tables
}

fn context_text(lines: &[TextLine]) -> String {
    lines
        .iter()
        .map(TextLine::text)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
