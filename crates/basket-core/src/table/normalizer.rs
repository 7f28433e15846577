//! Conversion of the selected table into basket records.

use serde::Serialize;
use tracing::{debug, trace, warn};

use super::header::{HeaderMapping, MappedColumn};
use super::patterns::{UNIT_SUFFIX, clean_cell, normalize_text};
use super::price::{is_placeholder, parse_price};
use crate::error::ExtractionError;
use crate::models::config::{ColumnLookup, ColumnRole, NormalizeConfig};
use crate::models::record::{BasketRecord, Period};
use crate::models::table::{ClassifiedTable, is_blank_row};

/// Counts of rows and cells excluded during normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SkipReport {
    /// Rows with no text.
    pub blank_rows: usize,
    /// Footnote rows (single leading cell or a known prefix).
    pub footnote_rows: usize,
    /// Rows repeating the header.
    pub repeated_headers: usize,
    /// Value cells holding a placeholder such as "-" or "N/A".
    pub missing_prices: usize,
    /// Value cells that are not numeric.
    pub malformed_prices: usize,
    /// Records rejected by validation.
    pub invalid_records: usize,
}

impl SkipReport {
    /// Non-fatal warnings: parse failures and rejected records.
    pub fn warnings(&self) -> usize {
        self.malformed_prices + self.invalid_records
    }
}

/// Records from one table plus what was skipped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Normalized {
    pub records: Vec<BasketRecord>,
    pub skipped: SkipReport,
}

/// Maps a classified table's header to canonical fields and emits records.
pub struct TableNormalizer {
    lookup: ColumnLookup,
    config: NormalizeConfig,
}

impl TableNormalizer {
    pub fn new(lookup: ColumnLookup, config: NormalizeConfig) -> Self {
        Self { lookup, config }
    }

    /// Normalize a classified table for the given reporting period.
    ///
    /// Records are emitted in row-then-column order. Fails only when the
    /// header cannot be mapped; bad rows and cells are counted and skipped.
    pub fn normalize(
        &self,
        table: &ClassifiedTable,
        period: Period,
    ) -> Result<Normalized, ExtractionError> {
        let header = table.header();
        let mapping = HeaderMapping::build(header, &self.lookup);
        let layout = self.layout(&mapping, header)?;

        debug!(
            "Header mapped {} of {} columns, label {:?} ({:?}), {} value columns",
            mapping.recognized(),
            header.len(),
            layout.label.label,
            layout.label.role,
            layout.values.len()
        );

        let header_key: Vec<String> = header.iter().map(|c| normalize_text(c)).collect();
        let mut records = Vec::new();
        let mut skipped = SkipReport::default();

        for (offset, row) in table.body().iter().enumerate() {
            let row_index = table.header_row + 1 + offset;

            if is_blank_row(row) {
                skipped.blank_rows += 1;
                continue;
            }
            if self.is_footnote(row) {
                trace!("Row {} skipped as footnote: {:?}", row_index, row);
                skipped.footnote_rows += 1;
                continue;
            }
            if row.iter().map(|c| normalize_text(c)).eq(header_key.iter().cloned()) {
                skipped.repeated_headers += 1;
                continue;
            }

            let label = row.get(layout.label.index).map(|c| clean_cell(c)).unwrap_or_default();
            let row_unit = layout
                .unit
                .and_then(|u| row.get(u.index))
                .map(|c| clean_cell(c))
                .filter(|u| !u.is_empty());

            for column in &layout.values {
                let cell = row.get(column.index).map(String::as_str).unwrap_or("");

                if is_placeholder(cell, &self.config.placeholders) {
                    trace!("Row {} column {:?}: no price", row_index, column.label);
                    skipped.missing_prices += 1;
                    continue;
                }

                let price = match parse_price(cell) {
                    Ok(price) => price,
                    Err(e) => {
                        warn!("Row {} column {:?} skipped: {}", row_index, column.label, e);
                        skipped.malformed_prices += 1;
                        continue;
                    }
                };

                let (region, item) = match layout.label.role {
                    ColumnRole::RegionLabel => (label.clone(), column.label.clone()),
                    _ => (column.label.clone(), label.clone()),
                };
                let unit = row_unit.clone().or_else(|| unit_from_item(&item));

                match BasketRecord::new(region, item, price, unit, period) {
                    Ok(record) => records.push(record),
                    Err(e) => {
                        warn!("Row {} column {:?} skipped: {}", row_index, column.label, e);
                        skipped.invalid_records += 1;
                    }
                }
            }
        }

        debug!(
            "Normalized {} records ({} warnings, {:?})",
            records.len(),
            skipped.warnings(),
            skipped
        );

        Ok(Normalized { records, skipped })
    }

    fn layout<'a>(
        &self,
        mapping: &'a HeaderMapping,
        header: &[String],
    ) -> Result<Layout<'a>, ExtractionError> {
        let required = self.config.min_recognized_columns;
        let unrecognized = || ExtractionError::UnrecognizedSchema {
            recognized: mapping.recognized(),
            required,
            header: header.iter().map(|c| clean_cell(c)).collect(),
        };

        if mapping.recognized() < required {
            return Err(unrecognized());
        }

        let label = mapping.label_column().ok_or_else(unrecognized)?;
        let values: Vec<&MappedColumn> = mapping.value_columns(label.role).collect();
        if values.is_empty() {
            return Err(unrecognized());
        }

        Ok(Layout {
            label,
            unit: mapping.unit_column(),
            values,
        })
    }

    fn is_footnote(&self, row: &[String]) -> bool {
        let mut filled = row.iter().filter(|c| !c.trim().is_empty());
        let first_filled = filled.next();
        let only_leading = !row.is_empty() && !row[0].trim().is_empty() && filled.next().is_none();

        let text = first_filled.map(|c| normalize_text(c)).unwrap_or_default();
        let prefixed = self
            .config
            .footnote_prefixes
            .iter()
            .any(|p| !p.is_empty() && text.starts_with(p.as_str()));

        only_leading || prefixed
    }
}

struct Layout<'a> {
    label: &'a MappedColumn,
    unit: Option<&'a MappedColumn>,
    values: Vec<&'a MappedColumn>,
}

fn unit_from_item(item: &str) -> Option<String> {
    UNIT_SUFFIX.captures(item).map(|caps| caps[1].to_string())
}
