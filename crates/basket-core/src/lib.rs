//! Core library for food basket report extraction.
//!
//! This crate provides:
//! - PDF table scanning (positioned text, line grouping, column alignment)
//! - Target table classification against a configurable signature
//! - Normalization of the selected table into typed basket records
//! - Record, table and configuration models

pub mod error;
pub mod models;
pub mod pdf;
pub mod pipeline;
pub mod table;

pub use error::{BasketError, FailureKind, Result};
pub use models::config::{BasketConfig, CanonicalField, ColumnLookup, ColumnRole, TableSignature};
pub use models::record::{BasketRecord, Period};
pub use models::table::{ClassifiedTable, Provenance, RawTable};
pub use pdf::{PdfTableScanner, TableScanner};
pub use pipeline::{BasketExtractor, Extraction};
pub use table::{Normalized, SkipReport, TableClassifier, TableNormalizer, TableScore};
