//! Header row to canonical field mapping.

use tracing::trace;

use super::patterns::{clean_cell, contains_at_word_start, normalize_text};
use crate::models::config::{CanonicalField, ColumnLookup, ColumnRole};

/// A header cell recognized as a canonical field.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedColumn {
    /// Column index in the table.
    pub index: usize,
    /// Canonical field name.
    pub field: String,
    /// Role of the column.
    pub role: ColumnRole,
    /// Header text with whitespace collapsed, original case.
    pub label: String,
}

/// Result of mapping a header row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HeaderMapping {
    /// Recognized columns, left to right.
    pub columns: Vec<MappedColumn>,
    /// Indices of non-empty header cells with no match.
    pub unmapped: Vec<usize>,
}

impl HeaderMapping {
    /// Map each header cell to the field with the longest matching keyword.
    ///
    /// A keyword matches when it occurs in the lowercased cell text at a
    /// word start, so extra words such as units in parentheses are tolerated.
    pub fn build(header: &[String], lookup: &ColumnLookup) -> Self {
        let mut mapping = HeaderMapping::default();

        for (index, cell) in header.iter().enumerate() {
            let normalized = normalize_text(cell);
            if normalized.is_empty() {
                continue;
            }

            match best_field(&normalized, &lookup.fields) {
                Some(field) => {
                    trace!("Header {:?} -> {} ({:?})", cell, field.name, field.role);
                    mapping.columns.push(MappedColumn {
                        index,
                        field: field.name.clone(),
                        role: field.role,
                        label: clean_cell(cell),
                    });
                }
                None => {
                    trace!("Header {:?} unmapped", cell);
                    mapping.unmapped.push(index);
                }
            }
        }

        mapping
    }

    pub fn recognized(&self) -> usize {
        self.columns.len()
    }

    /// The leftmost label column, which decides the table orientation.
    pub fn label_column(&self) -> Option<&MappedColumn> {
        self.columns.iter().find(|c| c.role.is_label())
    }

    /// The first unit column.
    pub fn unit_column(&self) -> Option<&MappedColumn> {
        self.columns.iter().find(|c| c.role == ColumnRole::Unit)
    }

    /// Value columns for the orientation implied by `label`.
    pub fn value_columns(&self, label: ColumnRole) -> impl Iterator<Item = &MappedColumn> {
        let wanted = match label {
            ColumnRole::RegionLabel => Some(ColumnRole::Item),
            ColumnRole::ItemLabel => Some(ColumnRole::Region),
            _ => None,
        };
        self.columns
            .iter()
            .filter(move |c| Some(c.role) == wanted)
    }
}

fn best_field<'a>(normalized: &str, fields: &'a [CanonicalField]) -> Option<&'a CanonicalField> {
    let mut best: Option<(&CanonicalField, usize)> = None;

    for field in fields {
        for keyword in &field.keywords {
            let keyword = normalize_text(keyword);
            if !contains_at_word_start(normalized, &keyword) {
                continue;
            }
            // Longest keyword wins; earlier fields win ties
            if best.map_or(true, |(_, len)| keyword.len() > len) {
                best = Some((field, keyword.len()));
            }
        }
    }

    best.map(|(field, _)| field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn header(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_region_rows_header() {
        let mapping = HeaderMapping::build(
            &header(&["Area", "Maize meal (kg)", "Rice\n(kg)", "", "Remarks"]),
            &ColumnLookup::default(),
        );

        assert_eq!(mapping.recognized(), 3);
        assert_eq!(mapping.unmapped, vec![4]);

        let label = mapping.label_column().unwrap();
        assert_eq!(label.role, ColumnRole::RegionLabel);

        let values: Vec<&str> = mapping
            .value_columns(ColumnRole::RegionLabel)
            .map(|c| c.label.as_str())
            .collect();
        assert_eq!(values, vec!["Maize meal (kg)", "Rice (kg)"]);
    }

    #[test]
    fn test_header_drift_region_area() {
        let lookup = ColumnLookup::default();
        for cell in ["Area", "Region/Area", "AREA (metro)"] {
            let mapping = HeaderMapping::build(&header(&[cell, "Rice"]), &lookup);
            assert_eq!(mapping.columns[0].field, "region", "header {:?}", cell);
        }
    }

    #[test]
    fn test_item_rows_header() {
        let mapping = HeaderMapping::build(
            &header(&["Foods tracked", "Quantity tracked", "Joburg", "Durban", "Cape Town", "Averag e"]),
            &ColumnLookup::default(),
        );

        assert_eq!(mapping.label_column().unwrap().role, ColumnRole::ItemLabel);
        assert_eq!(mapping.unit_column().unwrap().index, 1);
        let regions: Vec<&str> = mapping
            .value_columns(ColumnRole::ItemLabel)
            .map(|c| c.field.as_str())
            .collect();
        assert_eq!(regions, vec!["joburg", "durban", "cape town"]);
        assert_eq!(mapping.columns.last().unwrap().role, ColumnRole::Ignore);
    }

    #[test]
    fn test_longest_keyword_wins() {
        // "sugar beans" beats "sugar"
        let mapping = HeaderMapping::build(&header(&["Sugar beans (kg)"]), &ColumnLookup::default());
        assert_eq!(mapping.columns[0].field, "sugar beans");

        // "price" must not match the "rice" keyword
        let mapping = HeaderMapping::build(&header(&["Price"]), &ColumnLookup::default());
        assert_eq!(mapping.recognized(), 0);
    }
}
