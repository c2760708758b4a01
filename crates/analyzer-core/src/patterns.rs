//! Ordered pattern rules shared by the tokenizer and the field extractor.
//!
//! Each field has its own list of independent matchers evaluated in a fixed
//! precedence order. A rule either matches (returning the value and the byte
//! span it covered) or yields `None`; new formats are added by appending a
//! variant to the relevant list.

use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::error::{AnalyzerError, Result};
use crate::models::TaskType;

/// Number with optional thousands separators and decimal part.
const NUM: &str = r"\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?";

/// Words that mark a number as an XP value.
const MARKER: &str = r"xp|pts?|points?";

// ── Numbers ───────────────────────────────────────────────────────────────────

/// Parse a numeric token, tolerating thousands separators and decimals.
///
/// ```
/// use analyzer_core::patterns::parse_number;
///
/// assert_eq!(parse_number("1,250"), Some(1250.0));
/// assert_eq!(parse_number("12.5"), Some(12.5));
/// assert_eq!(parse_number("ten"), None);
/// ```
pub fn parse_number(token: &str) -> Option<f64> {
    let cleaned: String = token.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() || !cleaned.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

// ── Dates ─────────────────────────────────────────────────────────────────────

/// A date recognised inside a text span.
#[derive(Debug, Clone, PartialEq)]
pub struct DateMatch {
    pub date: NaiveDate,
    pub span: Range<usize>,
    pub rule: DateRule,
}

/// Supported date layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRule {
    /// `Monday, January 15th, 2025`, `Jan 15, 2025`.
    MonthName,
    /// `2025-01-15`.
    Iso,
    /// `1/15/2025` (month first).
    UsSlash,
}

/// Date rules in precedence order; the first rule that matches wins.
pub const DATE_RULES: [DateRule; 3] = [DateRule::MonthName, DateRule::Iso, DateRule::UsSlash];

static MONTH_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:(?:mon|tues?|wed(?:nes)?|thu(?:rs?)?|fri|sat(?:ur)?|sun)(?:day)?\.?,?\s+)?(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})\b",
    )
    .expect("regex is valid")
});

static ISO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b").expect("regex is valid"));

static US_SLASH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b").expect("regex is valid"));

static DAILY_TOTAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^\s*\(\s*({NUM})\s*(?:{MARKER})\s*\)")).expect("regex is valid")
});

impl DateRule {
    /// Find the first valid date of this layout in `text`.
    ///
    /// Matches that do not form a real calendar date (e.g. `2/30/2025`) are
    /// skipped and the search continues.
    pub fn find(&self, text: &str) -> Option<DateMatch> {
        let re = match self {
            DateRule::MonthName => &*MONTH_NAME_RE,
            DateRule::Iso => &*ISO_RE,
            DateRule::UsSlash => &*US_SLASH_RE,
        };

        re.captures_iter(text).find_map(|caps| {
            let whole = caps.get(0)?;
            let date = match self {
                DateRule::MonthName => {
                    let month = month_number(&caps[1])?;
                    let day: u32 = caps[2].parse().ok()?;
                    let year: i32 = caps[3].parse().ok()?;
                    NaiveDate::from_ymd_opt(year, month, day)
                }
                DateRule::Iso => NaiveDate::from_ymd_opt(
                    caps[1].parse().ok()?,
                    caps[2].parse().ok()?,
                    caps[3].parse().ok()?,
                ),
                DateRule::UsSlash => NaiveDate::from_ymd_opt(
                    caps[3].parse().ok()?,
                    caps[1].parse().ok()?,
                    caps[2].parse().ok()?,
                ),
            }?;
            Some(DateMatch {
                date,
                span: whole.range(),
                rule: *self,
            })
        })
    }
}

/// Apply [`DATE_RULES`] in order and return the first match.
pub fn find_date(text: &str) -> Option<DateMatch> {
    DATE_RULES.iter().find_map(|rule| rule.find(text))
}

/// Parse a `(120 XP)` daily total at the very start of `text`.
///
/// Returns the total and the number of bytes consumed.
pub fn daily_total_prefix(text: &str) -> Option<(f64, usize)> {
    let caps = DAILY_TOTAL_RE.captures(text)?;
    let total = parse_number(&caps[1])?;
    Some((total, caps.get(0)?.end()))
}

fn month_number(name: &str) -> Option<u32> {
    let month = match name.to_ascii_lowercase().as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

// ── Task keywords ─────────────────────────────────────────────────────────────

/// A task keyword located inside a text span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskMatch {
    pub task_type: TaskType,
    pub span: Range<usize>,
}

#[derive(Debug, Clone)]
struct TaskKeyword {
    word: String,
    task_type: TaskType,
    pattern: Regex,
}

/// Case-insensitive whole-word keyword table for task types.
#[derive(Debug, Clone)]
pub struct TaskKeywords {
    keywords: Vec<TaskKeyword>,
}

const STANDARD_KEYWORDS: &[(&str, TaskType)] = &[
    ("quiz", TaskType::Quiz),
    ("lesson", TaskType::Lesson),
    ("review", TaskType::Review),
    ("multistep", TaskType::Multistep),
    ("multi-step", TaskType::Multistep),
    ("placement", TaskType::Placement),
];

impl TaskKeywords {
    /// The built-in keyword set.
    pub fn standard() -> Self {
        let keywords = STANDARD_KEYWORDS
            .iter()
            .map(|(word, task_type)| {
                let pattern = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(word)))
                    .expect("regex is valid");
                TaskKeyword {
                    word: word.to_string(),
                    task_type: *task_type,
                    pattern,
                }
            })
            .collect();
        Self { keywords }
    }

    /// Built-in keywords followed by configured aliases.
    pub fn with_aliases(aliases: &BTreeMap<String, TaskType>) -> Result<Self> {
        let mut table = Self::standard();
        for (word, task_type) in aliases {
            let word = word.trim();
            if word.is_empty() {
                return Err(AnalyzerError::Config(
                    "task alias must not be empty".to_string(),
                ));
            }
            if *task_type == TaskType::Unknown {
                return Err(AnalyzerError::Config(format!(
                    "task alias \"{}\" cannot map to Unknown",
                    word
                )));
            }
            let pattern = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(word)))
                .map_err(|e| AnalyzerError::Config(format!("task alias \"{}\": {}", word, e)))?;
            table.keywords.push(TaskKeyword {
                word: word.to_lowercase(),
                task_type: *task_type,
                pattern,
            });
        }
        Ok(table)
    }

    /// Earliest keyword in `text` by position; ties go to the earlier table entry.
    pub fn find(&self, text: &str) -> Option<TaskMatch> {
        self.find_from(text, 0)
    }

    /// Like [`find`](Self::find) but only considers matches starting at or
    /// after `offset`.
    pub fn find_from(&self, text: &str, offset: usize) -> Option<TaskMatch> {
        let haystack = text.get(offset..)?;
        let mut best: Option<TaskMatch> = None;
        for kw in &self.keywords {
            if let Some(m) = kw.pattern.find(haystack) {
                let start = m.start() + offset;
                if best.as_ref().map_or(true, |b| start < b.span.start) {
                    best = Some(TaskMatch {
                        task_type: kw.task_type,
                        span: start..m.end() + offset,
                    });
                }
            }
        }
        best
    }

    /// Task type when `cell` consists of exactly one keyword.
    pub fn exact(&self, cell: &str) -> Option<TaskType> {
        let cell = cell.trim().to_lowercase();
        self.keywords
            .iter()
            .find(|kw| kw.word == cell)
            .map(|kw| kw.task_type)
    }
}

impl Default for TaskKeywords {
    fn default() -> Self {
        Self::standard()
    }
}

// ── XP values ─────────────────────────────────────────────────────────────────

/// An XP value located inside a text span.
#[derive(Debug, Clone, PartialEq)]
pub struct XpMatch {
    pub earned: f64,
    pub possible: Option<f64>,
    pub span: Range<usize>,
    pub rule: XpRule,
}

/// Supported XP layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XpRule {
    /// `18/15 XP`, `25/30`, `35/ XP`.
    Slash,
    /// `25 30 XP`.
    AdjacentPair,
    /// `10 XP`, `10 pts`.
    Marked,
    /// Trailing numeric cells of a table row; resolved by the extractor, not
    /// by text matching.
    TableCells,
}

/// XP rules in precedence order.
pub const XP_RULES: [XpRule; 3] = [XpRule::Slash, XpRule::AdjacentPair, XpRule::Marked];

static SLASH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b({NUM})\s*/\s*({NUM})?(\s*(?:{MARKER})\b)?"
    ))
    .expect("regex is valid")
});

static PAIR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b({NUM})\s+({NUM})\s*(?:{MARKER})\b")).expect("regex is valid")
});

static MARKED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b({NUM})\s*(?:{MARKER})\b")).expect("regex is valid")
});

impl XpRule {
    pub fn find(&self, text: &str) -> Option<XpMatch> {
        match self {
            XpRule::Slash => {
                // A marked pair beats a bare fraction; among bare fractions the
                // last one is taken since XP closes an entry.
                let mut marked: Option<XpMatch> = None;
                let mut bare: Option<XpMatch> = None;
                for caps in SLASH_RE.captures_iter(text) {
                    let has_marker = caps.get(3).is_some();
                    let possible = caps.get(2).and_then(|m| parse_number(m.as_str()));
                    if possible.is_none() && !has_marker {
                        continue;
                    }
                    let Some(earned) = parse_number(&caps[1]) else {
                        continue;
                    };
                    let Some(whole) = caps.get(0) else { continue };
                    let found = XpMatch {
                        earned,
                        possible,
                        span: whole.range(),
                        rule: *self,
                    };
                    if has_marker {
                        marked = Some(found);
                        break;
                    }
                    bare = Some(found);
                }
                marked.or(bare)
            }
            XpRule::AdjacentPair => {
                let caps = PAIR_RE.captures(text)?;
                Some(XpMatch {
                    earned: parse_number(&caps[1])?,
                    possible: Some(parse_number(&caps[2])?),
                    span: caps.get(0)?.range(),
                    rule: *self,
                })
            }
            XpRule::Marked => {
                let caps = MARKED_RE.captures(text)?;
                Some(XpMatch {
                    earned: parse_number(&caps[1])?,
                    possible: None,
                    span: caps.get(0)?.range(),
                    rule: *self,
                })
            }
            XpRule::TableCells => None,
        }
    }
}

/// Apply [`XP_RULES`] in order to `text[offset..]`; spans are relative to `text`.
pub fn find_xp_from(text: &str, offset: usize) -> Option<XpMatch> {
    let haystack = text.get(offset..)?;
    XP_RULES.iter().find_map(|rule| {
        rule.find(haystack).map(|mut m| {
            m.span = m.span.start + offset..m.span.end + offset;
            m
        })
    })
}

pub fn find_xp(text: &str) -> Option<XpMatch> {
    find_xp_from(text, 0)
}

/// XP of an entry whose task keyword ends at `task_end`.
///
/// A value after the keyword wins. Before the keyword only values carrying
/// an XP marker count; a bare fraction there is part of the course name
/// (`Math 7/8 Lesson`).
pub fn find_entry_xp(text: &str, task_end: Option<usize>) -> Option<XpMatch> {
    match task_end {
        Some(end) => find_xp_from(text, end).or_else(|| find_marked_xp(text)),
        None => find_xp(text),
    }
}

/// First value in rule order that is followed by an XP marker.
pub fn find_marked_xp(text: &str) -> Option<XpMatch> {
    XP_RULES.iter().find_map(|rule| {
        rule.find(text).filter(|m| match m.rule {
            XpRule::Slash => SLASH_RE
                .captures(&text[m.span.clone()])
                .is_some_and(|caps| caps.get(3).is_some()),
            _ => true,
        })
    })
}

/// Up to two purely numeric cells at the end of a table row, in row order.
///
/// Blank trailing cells are ignored.
pub fn trailing_numbers(cells: &[String]) -> Vec<f64> {
    let mut numbers: Vec<f64> = cells
        .iter()
        .rev()
        .map(|c| c.trim())
        .skip_while(|c| c.is_empty())
        .map_while(parse_number)
        .take(2)
        .collect();
    numbers.reverse();
    numbers
}

// ── Boilerplate ───────────────────────────────────────────────────────────────

/// Words that make up a column-header line of the activity table.
const COLUMN_LABELS: &[&str] = &[
    "course",
    "task",
    "type",
    "description",
    "xp",
    "earned",
    "possible",
    "date",
    "points",
    "pts",
];

static PAGE_FOOTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^page\s+\d+(?:\s+of\s+\d+)?$").expect("regex is valid")
});

/// `true` for report headers, student info, column headers and page footers.
pub fn is_boilerplate(line: &str, extra_prefixes: &[String]) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return false;
    }
    let lower = trimmed.to_lowercase();

    if lower.starts_with("activity log")
        || lower.contains("student id:")
        || lower.contains("start date:")
        || lower.contains("end date:")
        || PAGE_FOOTER_RE.is_match(trimmed)
    {
        return true;
    }

    if extra_prefixes
        .iter()
        .any(|p| !p.trim().is_empty() && lower.starts_with(&p.trim().to_lowercase()))
    {
        return true;
    }

    let words: Vec<String> = lower
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|w| !w.is_empty())
        .collect();
    words.len() >= 2 && words.iter().all(|w| COLUMN_LABELS.contains(&w.as_str()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
