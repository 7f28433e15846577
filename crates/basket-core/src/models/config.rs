//! Configuration structures for the extraction pipeline.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::BasketError;

/// Main configuration for the basket pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BasketConfig {
    /// Table detection configuration.
    pub scan: ScanConfig,

    /// Target table signature.
    pub signature: TableSignature,

    /// Header to canonical field lookup.
    pub columns: ColumnLookup,

    /// Record normalization configuration.
    pub normalize: NormalizeConfig,
}

/// Geometric tolerances for table region detection.
///
/// Fractional values are relative to the font size of the text involved.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Maximum baseline difference for fragments on the same line.
    pub line_tolerance: f32,

    /// Minimum horizontal gap separating two cells on a line.
    pub cell_gap: f32,

    /// Maximum baseline distance between consecutive rows of one region.
    pub max_row_gap: f32,

    /// Slack when testing horizontal overlap with a column, in points.
    pub alignment_tolerance: f32,

    /// Share of lines allowed to cover an x-interval that is still a gutter.
    pub gutter_ratio: f32,

    /// Glyph advance used when a font has no width table.
    pub char_width: f32,

    /// A text-only line closer than this fraction of the region's row pitch
    /// continues the row above (wrapped header or label cells).
    pub continuation_ratio: f32,

    /// Minimum multi-cell rows for a region to be emitted.
    pub min_rows: usize,

    /// Minimum columns for a region to be emitted.
    pub min_columns: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            line_tolerance: 0.3,
            cell_gap: 1.0,
            max_row_gap: 2.5,
            alignment_tolerance: 2.0,
            gutter_ratio: 0.2,
            char_width: 0.5,
            continuation_ratio: 0.8,
            min_rows: 2,
            min_columns: 2,
        }
    }
}

/// What the target table looks like. Used for scoring only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSignature {
    /// Keywords the header row must contain (case-insensitive, any order).
    pub keywords: Vec<String>,

    /// Minimum data rows below the header.
    pub min_rows: usize,

    /// Minimum columns.
    pub min_columns: usize,

    /// Number of leading rows searched for the header.
    pub header_lookahead: usize,

    /// Regex matched against the text above the table.
    pub title_pattern: Option<String>,

    /// Minimum score for a table to be selected.
    pub min_score: f32,
}

impl Default for TableSignature {
    fn default() -> Self {
        Self {
            keywords: vec!["area".to_string()],
            min_rows: 2,
            min_columns: 2,
            header_lookahead: 5,
            title_pattern: Some(DEFAULT_TITLE_PATTERN.to_string()),
            min_score: 0.0,
        }
    }
}

/// Title of the per-area comparison table, ignoring section number and month.
pub const DEFAULT_TITLE_PATTERN: &str =
    r"(?i)(?:\d+\.\s*)?(?:[A-Z]+\s+\d{4}\s+)?Household\s+Food\s+Basket\s*:\s*Per\s+area\s*,\s*compared";

/// What a mapped column holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    /// Column of region names; one row per region.
    RegionLabel,
    /// Column of item names; one row per item.
    ItemLabel,
    /// Column of units or quantities.
    Unit,
    /// Value column whose header names an item.
    Item,
    /// Value column whose header names a region.
    Region,
    /// Recognized column that yields no records (averages, totals).
    Ignore,
}

impl ColumnRole {
    pub fn is_label(&self) -> bool {
        matches!(self, ColumnRole::RegionLabel | ColumnRole::ItemLabel)
    }
}

/// A canonical field and the header substrings that map onto it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalField {
    /// Canonical name.
    pub name: String,
    /// Role of the column.
    pub role: ColumnRole,
    /// Lowercase substrings accepted in a header cell.
    pub keywords: Vec<String>,
}

impl CanonicalField {
    pub fn new(name: &str, role: ColumnRole, keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            role,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Data-driven header to canonical field mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnLookup {
    pub fields: Vec<CanonicalField>,
}

impl Default for ColumnLookup {
    fn default() -> Self {
        use ColumnRole::*;

        let fields = vec![
            CanonicalField::new("region", RegionLabel, &["area", "region", "city", "town", "province"]),
            CanonicalField::new("item", ItemLabel, &["foods tracked", "food item", "item", "product"]),
            CanonicalField::new("unit", Unit, &["quantity tracked", "quantity", "unit", "size"]),
            CanonicalField::new("average", Ignore, &["average", "averag", "total", "change", "difference"]),
            // Foods tracked by the publisher.
            CanonicalField::new("maize meal", Item, &["maize meal", "maize"]),
            CanonicalField::new("rice", Item, &["rice"]),
            CanonicalField::new("cake flour", Item, &["cake flour", "flour"]),
            CanonicalField::new("white sugar", Item, &["white sugar", "sugar"]),
            CanonicalField::new("sugar beans", Item, &["sugar beans", "beans"]),
            CanonicalField::new("samp", Item, &["samp"]),
            CanonicalField::new("cooking oil", Item, &["cooking oil", "oil"]),
            CanonicalField::new("bread", Item, &["bread"]),
            CanonicalField::new("eggs", Item, &["eggs"]),
            CanonicalField::new("chicken", Item, &["chicken"]),
            CanonicalField::new("potatoes", Item, &["potatoes"]),
            CanonicalField::new("onions", Item, &["onions"]),
            CanonicalField::new("tomatoes", Item, &["tomatoes"]),
            CanonicalField::new("milk", Item, &["milk", "maas"]),
            CanonicalField::new("tea", Item, &["tea"]),
            CanonicalField::new("basket", Item, &["basket"]),
            // Areas surveyed by the publisher.
            CanonicalField::new("joburg", Region, &["joburg", "johannesburg"]),
            CanonicalField::new("durban", Region, &["durban"]),
            CanonicalField::new("cape town", Region, &["cape town"]),
            CanonicalField::new("springbok", Region, &["springbok"]),
            CanonicalField::new("maritzburg", Region, &["maritzburg", "pietermaritzburg"]),
            CanonicalField::new("mtubatuba", Region, &["mtubatuba"]),
        ];

        Self { fields }
    }
}

/// Record normalization configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Minimum header cells mapped to canonical fields.
    pub min_recognized_columns: usize,

    /// Lowercase prefixes marking a footnote row.
    pub footnote_prefixes: Vec<String>,

    /// Lowercase cell values meaning "no price".
    pub placeholders: Vec<String>,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            min_recognized_columns: 2,
            footnote_prefixes: ["source:", "sources:", "note:", "notes:", "nb:", "*"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            placeholders: ["", "-", "–", "—", "n/a", "na", "n.a.", "..."]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl BasketConfig {
    /// Preset for the publisher's food-per-row layout.
    pub fn pmbejd() -> Self {
        Self {
            signature: TableSignature {
                keywords: ["foods tracked", "joburg", "durban", "cape town"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                min_rows: 5,
                min_columns: 5,
                ..TableSignature::default()
            },
            ..Self::default()
        }
    }

    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, BasketError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| BasketError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), BasketError> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| BasketError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject configurations that cannot select or map any table.
    pub fn validate(&self) -> Result<(), BasketError> {
        if self.signature.keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(BasketError::Config("signature.keywords is empty".to_string()));
        }
        if self.signature.header_lookahead == 0 {
            return Err(BasketError::Config(
                "signature.header_lookahead must be at least 1".to_string(),
            ));
        }
        if let Some(pattern) = &self.signature.title_pattern {
            Regex::new(pattern).map_err(|e| {
                BasketError::Config(format!("signature.title_pattern: {}", e))
            })?;
        }
        if let Some(field) = self
            .columns
            .fields
            .iter()
            .find(|f| f.keywords.iter().all(|k| k.trim().is_empty()))
        {
            return Err(BasketError::Config(format!(
                "column field {:?} has no keywords",
                field.name
            )));
        }
        if self.normalize.min_recognized_columns == 0 {
            return Err(BasketError::Config(
                "normalize.min_recognized_columns must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
