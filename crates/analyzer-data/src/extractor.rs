//! Field extraction from raw units.
//!
//! Each field is resolved by an ordered list of pattern rules (see
//! [`analyzer_core::patterns`]). Dates carry forward through an explicit
//! [`ExtractionContext`]: entries listed under a date header inherit it.

use std::ops::Range;
use std::sync::LazyLock;

use analyzer_core::config::ExtractionConfig;
use analyzer_core::error::Result;
use analyzer_core::models::{AnomalyFlag, RawUnit, RecordDraft, UnitSource};
use analyzer_core::patterns::{self, TaskKeywords, TaskMatch, XpMatch, XpRule};
use chrono::NaiveDate;
use regex::Regex;
use tracing::debug;

/// Leading bullets and `1.` / `1)` enumerators.
static LIST_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[-*•·–>]+|\(?\d{1,3}[.)])\s+").expect("regex is valid")
});

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("regex is valid"));

/// Characters trimmed from the end of a course name.
const TRAILING_PUNCT: &[char] = &[':', '-', '|', ',', ';', '–', '·'];

// ── Context and result ────────────────────────────────────────────────────────

/// State carried from one unit to the next within a single document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionContext {
    /// Most recent explicit date seen in the document.
    pub last_date: Option<NaiveDate>,
}

/// Outcome of extracting one unit.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// A candidate record (possibly missing mandatory fields).
    Draft(RecordDraft),
    /// A date heading with an optional stated daily total; no record.
    DateHeader {
        date: NaiveDate,
        daily_total: Option<f64>,
    },
    /// Nothing usable was found.
    Malformed,
}

// ── FieldExtractor ────────────────────────────────────────────────────────────

pub struct FieldExtractor {
    keywords: TaskKeywords,
    max_course_name_len: usize,
}

impl FieldExtractor {
    pub fn new(config: &ExtractionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            keywords: config.task_keywords()?,
            max_course_name_len: config.max_course_name_len,
        })
    }

    /// Keyword table, shared with the tokenizer.
    pub fn keywords(&self) -> &TaskKeywords {
        &self.keywords
    }

    /// Extract fields from `unit`, updating `ctx` with any explicit date.
    pub fn extract(&self, unit: &RawUnit, ctx: &mut ExtractionContext) -> Extraction {
        let text = unit.text();

        // Date and trailing daily total are cut out; everything else is
        // matched against the remainder.
        let date_match = patterns::find_date(&text);
        let (rest, daily_total) = match &date_match {
            Some(m) => {
                let after = &text[m.span.end..];
                match patterns::daily_total_prefix(after) {
                    Some((total, consumed)) => (
                        format!("{} {}", &text[..m.span.start], &after[consumed..]),
                        Some(total),
                    ),
                    None => (format!("{} {}", &text[..m.span.start], after), None),
                }
            }
            None => (text.clone(), None),
        };

        if let Some(m) = &date_match {
            if !rest.chars().any(|c| c.is_alphanumeric()) {
                ctx.last_date = Some(m.date);
                debug!(location = %unit.location, date = %m.date, "date header");
                return Extraction::DateHeader {
                    date: m.date,
                    daily_total,
                };
            }
        }

        let task = self.keywords.find(&rest);
        let xp = self.find_xp(&rest, task.as_ref(), unit);

        let (course, truncated) = match self.table_course(unit, date_match.is_some()) {
            Some(course) => self.finish_course(&course),
            None => {
                let end = [task.as_ref().map(|t| t.span.start), xp.as_ref().map(|x| x.span.start)]
                    .into_iter()
                    .flatten()
                    .min();
                match end {
                    Some(end) => self.finish_course(&rest[..end]),
                    None => (None, false),
                }
            }
        };

        if date_match.is_none() && course.is_none() && task.is_none() && xp.is_none() {
            debug!(location = %unit.location, "no fields found");
            return Extraction::Malformed;
        }

        let mut draft = RecordDraft::new(unit.location);
        match &date_match {
            Some(m) => {
                ctx.last_date = Some(m.date);
                draft.date = Some(m.date);
            }
            None => {
                if let Some(date) = ctx.last_date {
                    draft.date = Some(date);
                    draft.flags.insert(AnomalyFlag::InferredDate);
                }
            }
        }

        draft.course_name = course;
        if truncated {
            draft.flags.insert(AnomalyFlag::TruncatedCourseName);
        }
        draft.task_type = task.as_ref().map(|t| t.task_type);
        draft.description = task
            .as_ref()
            .and_then(|t| description(&rest, t, xp.as_ref()));
        if let Some(xp) = &xp {
            draft.xp_earned = Some(xp.earned);
            draft.xp_possible = xp.possible;
        }
        if unit.merged_across_pages {
            draft.flags.insert(AnomalyFlag::MergedAcrossPages);
        }

        debug!(
            location = %unit.location,
            date = ?draft.date,
            course = ?draft.course_name,
            task = ?draft.task_type,
            earned = ?draft.xp_earned,
            possible = ?draft.xp_possible,
            "extracted draft"
        );
        Extraction::Draft(draft)
    }

    // ── XP ────────────────────────────────────────────────────────────────────

    /// XP after the task keyword first, then a marked value anywhere, then
    /// trailing numeric table cells.
    fn find_xp(&self, rest: &str, task: Option<&TaskMatch>, unit: &RawUnit) -> Option<XpMatch> {
        if let Some(m) = patterns::find_entry_xp(rest, task.map(|t| t.span.end)) {
            return Some(m);
        }
        if unit.source() != UnitSource::Table {
            return None;
        }

        let numbers = patterns::trailing_numbers(&unit.tokens);
        let earned = *numbers.first()?;
        // Trailing cells sit at the end of the joined text.
        Some(XpMatch {
            earned,
            possible: numbers.get(1).copied(),
            span: numeric_tail_start(rest, numbers.len())..rest.len(),
            rule: XpRule::TableCells,
        })
    }

    // ── Course ────────────────────────────────────────────────────────────────

    /// For table rows with a cell that is exactly a task keyword, the course
    /// is made of the non-date cells before it.
    fn table_course(&self, unit: &RawUnit, has_date: bool) -> Option<String> {
        if unit.source() != UnitSource::Table {
            return None;
        }
        let keyword_cell = unit
            .tokens
            .iter()
            .position(|c| self.keywords.exact(c).is_some())?;
        let parts: Vec<&str> = unit.tokens[..keyword_cell]
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .filter(|c| !(has_date && patterns::find_date(c).is_some()))
            .filter(|c| patterns::parse_number(c).is_none())
            .collect();
        if parts.is_empty() {
            return None;
        }
        Some(parts.join(" "))
    }

    /// Clean a raw course span and apply the length limit.
    fn finish_course(&self, raw: &str) -> (Option<String>, bool) {
        let Some(cleaned) = clean_course(raw) else {
            return (None, false);
        };
        if cleaned.chars().count() <= self.max_course_name_len {
            return (Some(cleaned), false);
        }
        let truncated: String = cleaned.chars().take(self.max_course_name_len).collect();
        (Some(truncated.trim_end().to_string()), true)
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Trim list punctuation and collapse whitespace; `None` when nothing remains.
pub fn clean_course(raw: &str) -> Option<String> {
    let collapsed = WHITESPACE_RE.replace_all(raw.trim(), " ");
    let without_marker = LIST_MARKER_RE.replace(&collapsed, "");
    let cleaned = without_marker
        .trim_end_matches(|c: char| c.is_whitespace() || TRAILING_PUNCT.contains(&c))
        .trim_start_matches(|c: char| c.is_whitespace() || c == '|')
        .to_string();
    if cleaned.chars().any(|c| c.is_alphanumeric()) {
        Some(cleaned)
    } else {
        None
    }
}

/// Text between the task keyword and the XP value.
fn description(rest: &str, task: &TaskMatch, xp: Option<&XpMatch>) -> Option<String> {
    let end = match xp {
        Some(x) if x.span.start >= task.span.end => x.span.start,
        Some(_) => return None,
        None => rest.len(),
    };
    clean_span(rest, task.span.end..end)
}

fn clean_span(text: &str, span: Range<usize>) -> Option<String> {
    let slice = text.get(span)?;
    let collapsed = WHITESPACE_RE.replace_all(slice.trim(), " ");
    let trimmed = collapsed
        .trim_matches(|c: char| c.is_whitespace() || TRAILING_PUNCT.contains(&c))
        .to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Byte offset where the last `count` whitespace-separated tokens of `text` begin.
fn numeric_tail_start(text: &str, count: usize) -> usize {
    let trimmed = text.trim_end();
    let mut idx = trimmed.len();
    for _ in 0..count {
        let head = trimmed[..idx].trim_end();
        idx = head.rfind(char::is_whitespace).map(|i| i + 1).unwrap_or(0);
    }
    idx
}

// ── Tests ─────────────────────────────────────────────────────────────────────
