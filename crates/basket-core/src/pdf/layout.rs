//! Geometric table detection over positioned text.
//!
//! Fragments are grouped into lines by baseline, lines are split into cells
//! at wide horizontal gaps, and runs of vertically adjacent lines whose cells
//! share column anchors form table regions. Final columns come from the
//! gutters (x ranges almost no line covers) of each region.

use std::cmp::Ordering;
use std::ops::Range;

use tracing::trace;

use super::content::TextFragment;
use crate::models::config::ScanConfig;
use crate::table::patterns::PRICE;

/// Gap (in ems) above which adjacent fragments in a cell are joined with a space.
const SPACE_GAP: f32 = 0.15;

/// A horizontally contiguous piece of text on a line.
#[derive(Debug, Clone, PartialEq)]
pub struct TextCell {
    pub x0: f32,
    pub x1: f32,
    pub text: String,
}

/// Text sharing one baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub y: f32,
    pub font_size: f32,
    pub cells: Vec<TextCell>,
}

impl TextLine {
    pub fn text(&self) -> String {
        self.cells
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn is_multi_cell(&self) -> bool {
        self.cells.len() >= 2
    }
}

/// Group fragments into lines, top to bottom, and split each into cells.
pub fn group_lines(mut fragments: Vec<TextFragment>, config: &ScanConfig) -> Vec<TextLine> {
    fragments.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

    let mut grouped: Vec<Vec<TextFragment>> = Vec::new();
    for fragment in fragments {
        let joins = grouped.last().and_then(|line| line.first()).is_some_and(|first| {
            let size = first.font_size.max(fragment.font_size).max(1.0);
            (first.y - fragment.y).abs() <= size * config.line_tolerance
        });
        match grouped.last_mut() {
            Some(line) if joins => line.push(fragment),
            _ => grouped.push(vec![fragment]),
        }
    }

    grouped
        .into_iter()
        .map(|mut fragments| {
            fragments.sort_by(|a, b| a.x.total_cmp(&b.x));
            build_line(fragments, config)
        })
        .collect()
}

fn build_line(fragments: Vec<TextFragment>, config: &ScanConfig) -> TextLine {
    let y = fragments.first().map(|f| f.y).unwrap_or_default();
    let font_size = fragments
        .iter()
        .map(|f| f.font_size)
        .fold(0.0_f32, f32::max)
        .max(1.0);

    let mut cells: Vec<TextCell> = Vec::new();
    for fragment in fragments {
        let gap = cells.last().map(|c| fragment.x - c.x1);
        match (cells.last_mut(), gap) {
            (Some(cell), Some(gap)) if gap <= config.cell_gap * font_size => {
                let needs_space = gap > SPACE_GAP * font_size
                    && !cell.text.ends_with(char::is_whitespace)
                    && !fragment.text.starts_with(char::is_whitespace);
                if needs_space {
                    cell.text.push(' ');
                }
                cell.text.push_str(&fragment.text);
                cell.x1 = cell.x1.max(fragment.x1());
            }
            _ => cells.push(TextCell {
                x0: fragment.x,
                x1: fragment.x1(),
                text: fragment.text,
            }),
        }
    }

    for cell in &mut cells {
        cell.text = cell.text.trim().to_string();
    }

    TextLine { y, font_size, cells }
}

struct RegionBuilder {
    start: usize,
    multi_end: usize,
    multi_rows: usize,
    anchors: Vec<(f32, f32)>,
    last_y: f32,
    last_font: f32,
}

impl RegionBuilder {
    fn new(index: usize, line: &TextLine) -> Self {
        let mut anchors: Vec<(f32, f32)> = line.cells.iter().map(|c| (c.x0, c.x1)).collect();
        anchors.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self {
            start: index,
            multi_end: index + 1,
            multi_rows: 1,
            anchors,
            last_y: line.y,
            last_font: line.font_size,
        }
    }

    fn anchor_of(&self, cell: &TextCell, tol: f32) -> Option<usize> {
        self.anchors
            .iter()
            .position(|&(a0, a1)| cell.x0 <= a1 + tol && cell.x1 >= a0 - tol)
    }

    /// A multi-cell line continues the region when most of its cells line
    /// up with existing anchors.
    fn accepts(&self, line: &TextLine, tol: f32) -> bool {
        let matched = line
            .cells
            .iter()
            .filter(|c| self.anchor_of(c, tol).is_some())
            .count();
        matched >= 2.min(line.cells.len()) && matched * 2 >= line.cells.len()
    }

    /// A single-cell line continues the region when it starts in the first column.
    fn accepts_single(&self, line: &TextLine, tol: f32) -> bool {
        match (line.cells.first(), self.anchors.first()) {
            (Some(cell), Some(&(a0, a1))) => cell.x0 >= a0 - tol && cell.x0 <= a1 + tol,
            _ => false,
        }
    }

    fn push_multi(&mut self, index: usize, line: &TextLine, tol: f32) {
        for cell in &line.cells {
            match self.anchor_of(cell, tol) {
                Some(i) => {
                    let anchor = &mut self.anchors[i];
                    anchor.0 = anchor.0.min(cell.x0);
                    anchor.1 = anchor.1.max(cell.x1);
                }
                None => self.anchors.push((cell.x0, cell.x1)),
            }
        }
        self.anchors.sort_by(|a, b| a.0.total_cmp(&b.0));
        self.multi_end = index + 1;
        self.multi_rows += 1;
        self.touch(line);
    }

    fn touch(&mut self, line: &TextLine) {
        self.last_y = line.y;
        self.last_font = line.font_size;
    }

    fn finish(self, min_rows: usize, regions: &mut Vec<Range<usize>>) {
        if self.multi_rows >= min_rows {
            regions.push(self.start..self.multi_end);
        } else {
            trace!("Dropped candidate region at line {} ({} rows)", self.start, self.multi_rows);
        }
    }
}

/// Find line ranges that look like tables.
///
/// Trailing single-cell lines (footnotes, captions) are trimmed from each
/// region; interior ones (wrapped labels) are kept.
pub fn detect_regions(lines: &[TextLine], config: &ScanConfig) -> Vec<Range<usize>> {
    let mut regions = Vec::new();
    let mut current: Option<RegionBuilder> = None;

    for (index, line) in lines.iter().enumerate() {
        let tol = config.alignment_tolerance * line.font_size;

        if let Some(builder) = current.take() {
            let limit = config.max_row_gap * builder.last_font.max(line.font_size);
            if builder.last_y - line.y > limit {
                builder.finish(config.min_rows, &mut regions);
            } else {
                current = Some(builder);
            }
        }

        current = match current.take() {
            Some(mut builder) if line.is_multi_cell() => {
                if builder.accepts(line, tol) {
                    builder.push_multi(index, line, tol);
                    Some(builder)
                } else {
                    builder.finish(config.min_rows, &mut regions);
                    Some(RegionBuilder::new(index, line))
                }
            }
            Some(mut builder) => {
                if builder.accepts_single(line, tol) {
                    builder.touch(line);
                    Some(builder)
                } else {
                    builder.finish(config.min_rows, &mut regions);
                    None
                }
            }
            None if line.is_multi_cell() => Some(RegionBuilder::new(index, line)),
            None => None,
        };
    }

    if let Some(builder) = current {
        builder.finish(config.min_rows, &mut regions);
    }

    regions
}

/// Column spans of a region, from the gutters between its cells.
pub fn column_spans(lines: &[TextLine], config: &ScanConfig) -> Vec<(f32, f32)> {
    let multi: Vec<&TextLine> = lines.iter().filter(|l| l.is_multi_cell()).collect();
    if multi.is_empty() {
        return Vec::new();
    }

    let mut edges: Vec<f32> = multi
        .iter()
        .flat_map(|l| l.cells.iter().flat_map(|c| [c.x0, c.x1]))
        .collect();
    edges.sort_by(f32::total_cmp);
    edges.dedup_by(|a, b| (*a - *b).abs() < 0.01);

    let threshold = (multi.len() as f32 * config.gutter_ratio).floor() as usize;

    let mut spans: Vec<(f32, f32)> = Vec::new();
    let mut open: Option<(f32, f32)> = None;
    for pair in edges.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        let mid = (lo + hi) / 2.0;
        let coverage = multi
            .iter()
            .filter(|l| l.cells.iter().any(|c| c.x0 <= mid && mid <= c.x1))
            .count();

        if coverage > threshold {
            open = Some(match open {
                Some((start, _)) => (start, hi),
                None => (lo, hi),
            });
        } else if let Some(span) = open.take() {
            spans.push(span);
        }
    }
    if let Some(span) = open {
        spans.push(span);
    }

    spans
}

/// Lay a region out as a grid of cell strings.
///
/// Lines that continue a wrapped row (see [`is_continuation`]) are folded
/// into the row above, joined with a line break. Returns `None` when the
/// region has fewer than `min_columns` columns.
pub fn build_grid(lines: &[TextLine], config: &ScanConfig) -> Option<Vec<Vec<String>>> {
    let spans = column_spans(lines, config);
    if spans.len() < config.min_columns.max(1) {
        trace!("Region has {} columns, need {}", spans.len(), config.min_columns);
        return None;
    }

    let pitch = row_pitch(lines);
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut previous: Option<&TextLine> = None;

    for line in lines {
        let row = place_cells(line, &spans);
        let folds = match (previous, rows.last(), pitch) {
            (Some(above), Some(above_row), Some(pitch)) => {
                above.y - line.y < pitch * config.continuation_ratio
                    && is_continuation(above_row, &row)
            }
            _ => false,
        };

        match rows.last_mut() {
            Some(above_row) if folds => {
                trace!("Folding continuation line at y={}", line.y);
                for (slot, text) in above_row.iter_mut().zip(row) {
                    if !text.is_empty() {
                        slot.push('\n');
                        slot.push_str(&text);
                    }
                }
            }
            _ => rows.push(row),
        }
        previous = Some(line);
    }

    Some(rows)
}

fn place_cells(line: &TextLine, spans: &[(f32, f32)]) -> Vec<String> {
    let mut row = vec![String::new(); spans.len()];
    for cell in &line.cells {
        let slot = &mut row[column_for(cell, spans)];
        if !slot.is_empty() {
            slot.push(' ');
        }
        slot.push_str(&cell.text);
    }
    row
}

/// Typical baseline distance between consecutive lines of a region.
fn row_pitch(lines: &[TextLine]) -> Option<f32> {
    let mut gaps: Vec<f32> = lines.windows(2).map(|pair| pair[0].y - pair[1].y).collect();
    if gaps.len() < 2 {
        return None;
    }
    gaps.sort_by(f32::total_cmp);
    Some(gaps[gaps.len() / 2])
}

/// A wrapped line holds no values and only fills columns the row above
/// already has text in.
fn is_continuation(above: &[String], row: &[String]) -> bool {
    let filled = row.iter().filter(|t| !t.is_empty()).count();
    filled > 0
        && row
            .iter()
            .zip(above)
            .all(|(text, over)| text.is_empty() || (!over.is_empty() && !PRICE.is_match(text)))
}

fn column_for(cell: &TextCell, spans: &[(f32, f32)]) -> usize {
    if let Some(i) = spans.iter().position(|&(s0, s1)| s0 <= cell.x0 && cell.x0 <= s1) {
        return i;
    }

    let center = (cell.x0 + cell.x1) / 2.0;
    let distance = |&(s0, s1): &(f32, f32)| {
        if center < s0 {
            s0 - center
        } else if center > s1 {
            center - s1
        } else {
            0.0
        }
    };

    spans
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| distance(*a).partial_cmp(&distance(*b)).unwrap_or(Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0)
}
