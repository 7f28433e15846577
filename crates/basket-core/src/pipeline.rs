//! End-to-end extraction: scan, classify, normalize.

use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{BasketError, Result};
use crate::models::config::BasketConfig;
use crate::models::record::{BasketRecord, Period};
use crate::models::table::RawTable;
use crate::pdf::{PdfTableScanner, TableScanner};
use crate::table::{SkipReport, TableClassifier, TableNormalizer, TableScore};

/// Result of extracting one document.
#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    /// Normalized records, in table order.
    pub records: Vec<BasketRecord>,
    /// Reporting period the records were stamped with.
    pub period: Period,
    /// Page of the selected table.
    pub page: u32,
    /// Classification score of the selected table.
    pub score: f32,
    /// Header row of the selected table.
    pub header: Vec<String>,
    /// Rows and cells skipped during normalization.
    pub skipped: SkipReport,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

impl Extraction {
    pub fn warning_count(&self) -> usize {
        self.skipped.warnings()
    }
}

/// Composes the scanner, classifier and normalizer for one configuration.
///
/// Holds no per-document state, so a single extractor can be shared across
/// threads.
pub struct BasketExtractor<S = PdfTableScanner> {
    scanner: S,
    classifier: TableClassifier,
    normalizer: TableNormalizer,
}

impl BasketExtractor<PdfTableScanner> {
    /// Validate `config` and build the PDF pipeline.
    pub fn new(config: BasketConfig) -> Result<Self> {
        config.validate()?;
        let scanner = PdfTableScanner::new(config.scan.clone());
        Self::with_scanner(scanner, config)
    }
}

impl<S: TableScanner> BasketExtractor<S> {
    /// Build a pipeline around a custom table source.
    pub fn with_scanner(scanner: S, config: BasketConfig) -> Result<Self> {
        let classifier = TableClassifier::new(config.signature)?;
        let normalizer = TableNormalizer::new(config.columns, config.normalize);
        Ok(Self {
            scanner,
            classifier,
            normalizer,
        })
    }

    /// Extract basket records from a document.
    ///
    /// When `period` is `None` it is read from the text above the selected
    /// table (for example "May 2025"), then from the text above any other
    /// table in the document.
    pub fn extract(&self, pdf: &[u8], period: Option<Period>) -> Result<Extraction> {
        let start = Instant::now();

        let tables = self.scan_all(pdf)?;
        info!("Scanned {} candidate tables", tables.len());

        let contexts: Vec<String> = tables.iter().map(|t| t.context.clone()).collect();
        let classified = self.classifier.classify(tables)?;

        let period = match period {
            Some(period) => period,
            None => detect_period(&classified.table.context, &contexts).ok_or_else(|| {
                BasketError::Config(
                    "no reporting period given and none found in the document".to_string(),
                )
            })?,
        };

        let normalized = self.normalizer.normalize(&classified, period)?;
        if normalized.skipped.warnings() > 0 {
            warn!(
                "{} malformed prices, {} invalid records skipped",
                normalized.skipped.malformed_prices, normalized.skipped.invalid_records
            );
        }

        let extraction = Extraction {
            records: normalized.records,
            period,
            page: classified.table.provenance.page,
            score: classified.score,
            header: classified.header().to_vec(),
            skipped: normalized.skipped,
            processing_time_ms: start.elapsed().as_millis() as u64,
        };

        debug!(
            "Extracted {} records for {} from page {} in {} ms",
            extraction.records.len(),
            extraction.period,
            extraction.page,
            extraction.processing_time_ms
        );
        Ok(extraction)
    }

    /// Every candidate table with its score, in document order.
    pub fn inspect(&self, pdf: &[u8]) -> Result<Vec<(RawTable, TableScore)>> {
        let tables = self.scan_all(pdf)?;
        Ok(tables
            .into_iter()
            .map(|t| {
                let score = self.classifier.score(&t);
                (t, score)
            })
            .collect())
    }

    fn scan_all(&self, pdf: &[u8]) -> Result<Vec<RawTable>> {
        let tables = self
            .scanner
            .scan(pdf)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tables)
    }
}

fn detect_period(selected: &str, contexts: &[String]) -> Option<Period> {
    Period::find_in(selected).or_else(|| contexts.iter().find_map(|c| Period::find_in(c)))
}
