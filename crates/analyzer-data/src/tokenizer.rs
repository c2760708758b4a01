//! Splits page content into raw units, one candidate learning event each.
//!
//! Table rows map one-to-one onto units. Text lines are grouped: a unit runs
//! until its XP value has been seen, a blank line appears, or a line clearly
//! starts the next entry. A unit left open at the bottom of a page stays open
//! on the next one, so a page break never changes how lines are grouped.

use analyzer_core::config::ExtractionConfig;
use analyzer_core::models::{Page, RawUnit, UnitLocation, UnitSource};
use analyzer_core::patterns::{self, TaskKeywords};
use tracing::debug;

/// Vertical gap, relative to the median line spacing, that splits two lines
/// the same way a blank line does.
const GAP_FACTOR: f64 = 1.8;

// ── Unit state ────────────────────────────────────────────────────────────────

/// What is known about the text accumulated so far in a unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct UnitShape {
    has_task: bool,
    has_xp: bool,
    /// Date (plus optional daily total) and nothing else.
    date_only: bool,
}

impl UnitShape {
    /// A unit that no further line may extend.
    fn is_closed(&self) -> bool {
        self.has_xp || self.date_only
    }
}

/// Per-line classification used for grouping decisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct LineShape {
    has_date: bool,
    /// Course text followed by a task keyword.
    starts_entry: bool,
}

// ── EntryTokenizer ────────────────────────────────────────────────────────────

/// Stateless splitter from pages into [`RawUnit`]s.
pub struct EntryTokenizer<'a> {
    keywords: &'a TaskKeywords,
    skip_prefixes: &'a [String],
}

impl<'a> EntryTokenizer<'a> {
    pub fn new(keywords: &'a TaskKeywords, config: &'a ExtractionConfig) -> Self {
        Self {
            keywords,
            skip_prefixes: &config.skip_prefixes,
        }
    }

    /// Units of all `pages` in document order.
    pub fn tokenize(&self, pages: &[Page]) -> Vec<RawUnit> {
        let mut units: Vec<RawUnit> = Vec::new();

        for (page_idx, page) in pages.iter().enumerate() {
            let pending = units.last().is_some_and(|u| self.is_unterminated(u));

            if has_table_rows(page) {
                let mut rows = self.tokenize_rows(page_idx, &page.table_rows);
                let continues = pending
                    && match (units.last(), rows.first()) {
                        (Some(prev), Some(first)) => !self.opens_new_unit(
                            &self.shape(&prev.text()),
                            &self.line_shape(&first.text()),
                        ),
                        _ => false,
                    };
                if let Some(prev) = units.last_mut().filter(|_| continues) {
                    let continuation = rows.remove(0);
                    debug!(
                        "merging {} into unit at {} across page break",
                        continuation.location, prev.location
                    );
                    prev.tokens.extend(continuation.tokens);
                    prev.merged_across_pages = true;
                }
                units.extend(rows);
            } else {
                // The open unit keeps grouping lines on this page exactly as
                // if no break had occurred.
                let carried = if pending { units.pop() } else { None };
                units.extend(self.tokenize_lines(page_idx, page, carried));
            }
        }

        debug!("tokenized {} pages into {} units", pages.len(), units.len());
        units
    }

    // ── Tables ────────────────────────────────────────────────────────────────

    fn tokenize_rows(&self, page_idx: usize, rows: &[Vec<String>]) -> Vec<RawUnit> {
        rows.iter()
            .enumerate()
            .filter_map(|(row_idx, row)| {
                let cells: Vec<String> = row.iter().map(|c| c.trim().to_string()).collect();
                let joined = cells
                    .iter()
                    .filter(|c| !c.is_empty())
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(" ");
                if joined.is_empty() || patterns::is_boilerplate(&joined, self.skip_prefixes) {
                    return None;
                }
                Some(RawUnit::new(
                    UnitLocation::new(page_idx, row_idx, UnitSource::Table),
                    cells,
                ))
            })
            .collect()
    }

    // ── Text ──────────────────────────────────────────────────────────────────

    /// Group the text lines of one page, starting with `carried` as the open
    /// unit when the previous page ended mid-entry.
    fn tokenize_lines(
        &self,
        page_idx: usize,
        page: &Page,
        carried: Option<RawUnit>,
    ) -> Vec<RawUnit> {
        let breaks = gap_breaks(&page.line_tops, page.text_lines.len());
        let mut units: Vec<RawUnit> = Vec::new();
        let mut open = carried;
        let mut seen_content = false;

        for (line_idx, raw_line) in page.text_lines.iter().enumerate() {
            let line = raw_line.trim();

            // Leading blank lines of a page do not end a carried unit.
            if seen_content && (line.is_empty() || breaks[line_idx]) {
                if let Some(unit) = open.take() {
                    units.push(unit);
                }
            }
            if line.is_empty() || patterns::is_boilerplate(line, self.skip_prefixes) {
                continue;
            }
            seen_content = true;

            if let Some(unit) = open.as_mut() {
                let shape = self.shape(&unit.text());
                if !self.opens_new_unit(&shape, &self.line_shape(line)) {
                    if unit.location.page != page_idx && !unit.merged_across_pages {
                        debug!(
                            "merging page {} line {} into unit at {} across page break",
                            page_idx + 1,
                            line_idx + 1,
                            unit.location
                        );
                        unit.merged_across_pages = true;
                    }
                    unit.tokens.push(line.to_string());
                    continue;
                }
            }

            if let Some(unit) = open.take() {
                units.push(unit);
            }
            let mut unit = RawUnit::new(
                UnitLocation::new(page_idx, line_idx, UnitSource::Text),
                vec![line.to_string()],
            );
            unit.top = page.line_tops.get(line_idx).copied();
            open = Some(unit);
        }

        if let Some(unit) = open.take() {
            units.push(unit);
        }
        units
    }

    // ── Classification ────────────────────────────────────────────────────────

    /// Whether `unit` still waits for its XP value.
    fn is_unterminated(&self, unit: &RawUnit) -> bool {
        if self.shape(&unit.text()).is_closed() {
            return false;
        }
        unit.source() == UnitSource::Text || patterns::trailing_numbers(&unit.tokens).is_empty()
    }

    fn opens_new_unit(&self, open: &UnitShape, line: &LineShape) -> bool {
        line.has_date || open.is_closed() || (line.starts_entry && open.has_task)
    }

    fn shape(&self, text: &str) -> UnitShape {
        let (has_date, rest) = strip_date(text);
        let task = self.keywords.find(&rest);
        let has_xp = patterns::find_entry_xp(&rest, task.as_ref().map(|t| t.span.end)).is_some();
        UnitShape {
            has_task: task.is_some(),
            has_xp,
            date_only: has_date && !rest.chars().any(|c| c.is_alphanumeric()),
        }
    }

    fn line_shape(&self, line: &str) -> LineShape {
        let (has_date, rest) = strip_date(line);
        let starts_entry = self
            .keywords
            .find(&rest)
            .map(|m| rest[..m.span.start].chars().any(|c| c.is_alphanumeric()))
            .unwrap_or(false);
        LineShape {
            has_date,
            starts_entry,
        }
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn has_table_rows(page: &Page) -> bool {
    page.table_rows
        .iter()
        .any(|row| row.iter().any(|c| !c.trim().is_empty()))
}

/// Remove the first date and a daily total right after it.
fn strip_date(text: &str) -> (bool, String) {
    let Some(m) = patterns::find_date(text) else {
        return (false, text.to_string());
    };
    let after = &text[m.span.end..];
    let after = match patterns::daily_total_prefix(after) {
        Some((_, consumed)) => &after[consumed..],
        None => after,
    };
    (true, format!("{} {}", &text[..m.span.start], after))
}

/// For each line, whether the gap above it is large enough to end a unit.
///
/// Without a complete set of positions no line is split.
fn gap_breaks(tops: &[f64], line_count: usize) -> Vec<bool> {
    let mut breaks = vec![false; line_count];
    if tops.len() != line_count || line_count < 3 {
        return breaks;
    }

    let mut gaps: Vec<f64> = tops
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|g| *g > 0.0)
        .collect();
    if gaps.is_empty() {
        return breaks;
    }
    gaps.sort_by(|a, b| a.total_cmp(b));
    let median = gaps[gaps.len() / 2];

    for i in 1..line_count {
        let gap = tops[i] - tops[i - 1];
        if gap > median * GAP_FACTOR {
            breaks[i] = true;
        }
    }
    breaks
}

// ── Tests ─────────────────────────────────────────────────────────────────────
