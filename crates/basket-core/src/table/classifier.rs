//! Target table selection by signature scoring.
//!
//! Each candidate's first rows are searched for a header containing every
//! signature keyword. Complete, large enough candidates are scored:
//!
//! - one point per keyword matched in the header row
//! - half a point each for exceeding the minimum rows and columns
//! - one point when the title pattern matches the text above the table
//! - minus half a point on the first or last page of a 3+ page document
//!
//! The highest score wins; ties go to the table with more data rows, then to
//! the earliest table in document order.

use std::cmp::Ordering;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, trace};

use super::patterns::normalize_text;
use crate::error::{BasketError, ClassifyError};
use crate::models::config::TableSignature;
use crate::models::table::{ClassifiedTable, RawTable};

const DIMENSION_BONUS: f32 = 0.5;
const TITLE_BONUS: f32 = 1.0;
const EDGE_PENALTY: f32 = 0.5;

/// Score breakdown for one candidate table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableScore {
    /// Document-order index of the candidate.
    pub ordinal: usize,
    /// Page the candidate is on.
    pub page: u32,
    /// Best header row found in the lookahead window.
    pub header_row: Option<usize>,
    /// Signature keywords found in that row.
    pub keywords_matched: usize,
    /// Signature keywords required.
    pub keywords_required: usize,
    /// Non-blank rows below the header.
    pub data_rows: usize,
    /// Column count.
    pub columns: usize,
    /// Whether the title pattern matched the table's context.
    pub title_matched: bool,
    /// Total score.
    pub score: f32,
    /// Whether the candidate can be selected.
    pub eligible: bool,
}

/// Scores raw tables against a signature and selects the target.
pub struct TableClassifier {
    keywords: Vec<String>,
    signature: TableSignature,
    title: Option<Regex>,
}

impl TableClassifier {
    /// Create a classifier, compiling the signature's title pattern.
    pub fn new(signature: TableSignature) -> Result<Self, BasketError> {
        let title = signature
            .title_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| BasketError::Config(format!("signature.title_pattern: {}", e)))?;

        let keywords = signature
            .keywords
            .iter()
            .map(|k| normalize_text(k))
            .filter(|k| !k.is_empty())
            .collect();

        Ok(Self {
            keywords,
            signature,
            title,
        })
    }

    /// Score one table. Pure function of the table and the signature.
    pub fn score(&self, table: &RawTable) -> TableScore {
        let required = self.keywords.len();
        let window = self.signature.header_lookahead.min(table.num_rows());

        // First row with every keyword; otherwise the row with the most
        let mut header_row = None;
        let mut matched = 0;
        for index in 0..window {
            let row = table.row(index).unwrap_or(&[]);
            let joined = normalize_text(&row.join(" "));
            let count = self.keywords.iter().filter(|k| joined.contains(k.as_str())).count();
            if count > matched {
                matched = count;
                header_row = Some(index);
            }
            if count == required {
                break;
            }
        }

        let data_rows = header_row.map_or(0, |h| table.non_blank_rows_after(h));
        let columns = table.num_cols();
        let title_matched = self
            .title
            .as_ref()
            .is_some_and(|re| re.is_match(&table.context));

        let complete = required > 0 && matched == required;
        let large_enough =
            data_rows >= self.signature.min_rows && columns >= self.signature.min_columns;

        let mut score = matched as f32;
        if data_rows > self.signature.min_rows {
            score += DIMENSION_BONUS;
        }
        if columns > self.signature.min_columns {
            score += DIMENSION_BONUS;
        }
        if title_matched {
            score += TITLE_BONUS;
        }
        if is_edge_page(table) {
            score -= EDGE_PENALTY;
        }

        let eligible = complete && large_enough && score >= self.signature.min_score;

        TableScore {
            ordinal: table.provenance.ordinal,
            page: table.provenance.page,
            header_row,
            keywords_matched: matched,
            keywords_required: required,
            data_rows,
            columns,
            title_matched,
            score,
            eligible,
        }
    }

    /// Score every table, best first. Ineligible tables sort last.
    pub fn rank(&self, tables: &[RawTable]) -> Vec<TableScore> {
        let mut scores: Vec<TableScore> = tables.iter().map(|t| self.score(t)).collect();
        scores.sort_by(compare_scores);
        scores
    }

    /// Select the single best-matching table.
    pub fn classify(&self, tables: Vec<RawTable>) -> Result<ClassifiedTable, ClassifyError> {
        let candidates = tables.len();
        let scores: Vec<TableScore> = tables.iter().map(|t| self.score(t)).collect();

        for s in &scores {
            trace!(
                "Table #{} (page {}): {}/{} keywords, {} rows, {} cols, title={}, score={:.1}, eligible={}",
                s.ordinal, s.page, s.keywords_matched, s.keywords_required,
                s.data_rows, s.columns, s.title_matched, s.score, s.eligible
            );
        }

        let best = scores
            .iter()
            .enumerate()
            .filter(|(_, s)| s.eligible)
            .min_by(|(_, a), (_, b)| compare_scores(a, b))
            .map(|(i, s)| (i, s.clone()));

        match best {
            Some((index, score)) => {
                debug!(
                    "Selected table #{} on page {} (score {:.1}, header row {:?})",
                    score.ordinal, score.page, score.score, score.header_row
                );
                let table = tables.into_iter().nth(index).ok_or_else(|| {
                    ClassifyError::NoMatchingTable {
                        candidates,
                        reason: "selected table vanished".to_string(),
                    }
                })?;
                Ok(ClassifiedTable {
                    table,
                    score: score.score,
                    header_row: score.header_row.unwrap_or(0),
                })
            }
            None => Err(ClassifyError::NoMatchingTable {
                candidates,
                reason: self.explain_miss(&scores),
            }),
        }
    }

    fn explain_miss(&self, scores: &[TableScore]) -> String {
        if scores.is_empty() {
            return "no tables detected".to_string();
        }

        let mut title_pages: Vec<u32> = scores
            .iter()
            .filter(|s| s.title_matched)
            .map(|s| s.page)
            .collect();
        title_pages.dedup();

        let closest = scores
            .iter()
            .max_by(|a, b| {
                a.keywords_matched
                    .cmp(&b.keywords_matched)
                    .then_with(|| b.ordinal.cmp(&a.ordinal))
            })
            .map(|s| {
                format!(
                    "closest is table #{} on page {} with {}/{} keywords, {} data rows, {} columns",
                    s.ordinal, s.page, s.keywords_matched, s.keywords_required, s.data_rows, s.columns
                )
            })
            .unwrap_or_default();

        if title_pages.is_empty() {
            format!("no header contains all of {:?}; {}", self.keywords, closest)
        } else {
            format!(
                "title matched on page(s) {:?} but no header contains all of {:?}; {}",
                title_pages, self.keywords, closest
            )
        }
    }
}

fn is_edge_page(table: &RawTable) -> bool {
    let p = table.provenance;
    p.page_count >= 3 && (p.page <= 1 || p.page >= p.page_count)
}

/// Order: eligible first, higher score, more data rows, earlier ordinal.
fn compare_scores(a: &TableScore, b: &TableScore) -> Ordering {
    b.eligible
        .cmp(&a.eligible)
        .then_with(|| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal))
        .then_with(|| b.data_rows.cmp(&a.data_rows))
        .then_with(|| a.ordinal.cmp(&b.ordinal))
}
