//! CSV record store keyed by (region, item, period).

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use basket_core::{BasketRecord, Period};

/// Flat CSV row for a record. Every column is always written.
#[derive(Serialize)]
pub struct CsvRow<'a> {
    pub region: &'a str,
    pub item: &'a str,
    pub price: Decimal,
    pub unit: Option<&'a str>,
    pub period: Period,
}

impl<'a> From<&'a BasketRecord> for CsvRow<'a> {
    fn from(record: &'a BasketRecord) -> Self {
        Self {
            region: record.region(),
            item: record.item(),
            price: record.price(),
            unit: record.unit(),
            period: record.period(),
        }
    }
}

/// Outcome of an upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertStats {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
}

/// Records persisted as a CSV file, one row per (region, item, period).
pub struct RecordStore {
    path: PathBuf,
}

type Key = (String, String, Period);

fn key_of(record: &BasketRecord) -> Key {
    (record.region().to_string(), record.item().to_string(), record.period())
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every stored record. A missing file is an empty store.
    pub fn load(&self) -> anyhow::Result<Vec<BasketRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut records = Vec::new();
        for row in reader.deserialize() {
            let record: BasketRecord = row?;
            records.push(record);
        }
        Ok(records)
    }

    /// Insert new records and replace stored ones with the same key.
    ///
    /// Existing rows keep their position; new rows are appended. The file is
    /// rewritten through a temporary file.
    pub fn upsert(&self, records: &[BasketRecord]) -> anyhow::Result<UpsertStats> {
        let mut stored = self.load()?;
        let mut index: HashMap<Key, usize> = stored
            .iter()
            .enumerate()
            .map(|(i, r)| (key_of(r), i))
            .collect();

        let mut stats = UpsertStats::default();
        for record in records {
            match index.get(&key_of(record)) {
                Some(&i) if stored[i] == *record => stats.unchanged += 1,
                Some(&i) => {
                    stored[i] = record.clone();
                    stats.updated += 1;
                }
                None => {
                    index.insert(key_of(record), stored.len());
                    stored.push(record.clone());
                    stats.inserted += 1;
                }
            }
        }

        self.write(&stored)?;
        debug!(
            "Store {}: {} inserted, {} updated, {} unchanged",
            self.path.display(),
            stats.inserted,
            stats.updated,
            stats.unchanged
        );
        Ok(stats)
    }

    fn write(&self, records: &[BasketRecord]) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.path.with_extension("tmp");
        {
            let mut wtr = csv::Writer::from_path(&temp_path)?;
            if records.is_empty() {
                wtr.write_record(["region", "item", "price", "unit", "period"])?;
            }
            for record in records {
                wtr.serialize(CsvRow::from(record))?;
            }
            wtr.flush()?;
        }
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}
