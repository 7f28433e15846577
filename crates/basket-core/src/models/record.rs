//! Basket record and reporting period models.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ExtractionError;
use crate::table::patterns::MONTH_YEAR;

/// Reporting month of a document.
///
/// Stored as the first day of the month. Serialized as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period(NaiveDate);

impl Period {
    /// Create a period from a year and a 1-based month.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Self)
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    /// First day of the reporting month.
    pub fn first_day(&self) -> NaiveDate {
        self.0
    }

    /// Find the first "MONTH YYYY" mention in free text (e.g. a table title).
    pub fn find_in(text: &str) -> Option<Self> {
        let caps = MONTH_YEAR.captures(text)?;
        let month = month_from_name(&caps[1])?;
        let year = caps[2].parse().ok()?;
        Self::new(year, month)
    }
}

fn month_from_name(name: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    let lower = name.to_lowercase();
    MONTHS
        .iter()
        .position(|m| lower.starts_with(m))
        .map(|i| i as u32 + 1)
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl FromStr for Period {
    type Err = ExtractionError;

    /// Parse `YYYY-MM`, `YYYY-MM-DD` or `Month YYYY`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || ExtractionError::InvalidRecord {
            field: "period".to_string(),
            reason: format!("cannot parse {:?} as a reporting month", s),
        };

        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Self::new(date.year(), date.month()).ok_or_else(invalid);
        }

        if let Some((year, month)) = s.split_once('-') {
            if let (Ok(year), Ok(month)) = (year.parse::<i32>(), month.parse::<u32>()) {
                return Self::new(year, month).ok_or_else(invalid);
            }
        }

        Self::find_in(s).ok_or_else(invalid)
    }
}

impl Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One price observation: an item's price in a region for a reporting month.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RecordFields")]
pub struct BasketRecord {
    region: String,
    item: String,
    price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit: Option<String>,
    period: Period,
}

#[derive(Deserialize)]
struct RecordFields {
    region: String,
    item: String,
    price: Decimal,
    #[serde(default)]
    unit: Option<String>,
    period: Period,
}

impl TryFrom<RecordFields> for BasketRecord {
    type Error = ExtractionError;

    fn try_from(fields: RecordFields) -> Result<Self, Self::Error> {
        BasketRecord::new(fields.region, fields.item, fields.price, fields.unit, fields.period)
    }
}

impl BasketRecord {
    /// Create a validated record.
    ///
    /// Region and item are trimmed and must be non-empty; price must be
    /// non-negative. An empty unit is treated as absent.
    pub fn new(
        region: impl Into<String>,
        item: impl Into<String>,
        price: Decimal,
        unit: Option<String>,
        period: Period,
    ) -> Result<Self, ExtractionError> {
        let region = region.into().trim().to_string();
        let item = item.into().trim().to_string();

        if region.is_empty() {
            return Err(ExtractionError::InvalidRecord {
                field: "region".to_string(),
                reason: "empty".to_string(),
            });
        }
        if item.is_empty() {
            return Err(ExtractionError::InvalidRecord {
                field: "item".to_string(),
                reason: "empty".to_string(),
            });
        }
        if price.is_sign_negative() && !price.is_zero() {
            return Err(ExtractionError::InvalidRecord {
                field: "price".to_string(),
                reason: format!("negative price {}", price),
            });
        }

        let unit = unit
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());

        Ok(Self {
            region,
            item,
            price,
            unit,
            period,
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn item(&self) -> &str {
        &self.item
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn period(&self) -> Period {
        self.period
    }

    /// Storage key: (region, item, period).
    pub fn key(&self) -> (&str, &str, Period) {
        (&self.region, &self.item, self.period)
    }
}
