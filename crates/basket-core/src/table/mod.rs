//! Target table classification and record normalization.

mod classifier;
pub mod header;
mod normalizer;
pub mod patterns;
pub mod price;

pub use classifier::{TableClassifier, TableScore};
pub use header::{HeaderMapping, MappedColumn};
pub use normalizer::{Normalized, SkipReport, TableNormalizer};
pub use price::parse_price;
