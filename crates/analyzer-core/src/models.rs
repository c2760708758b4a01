use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ── Document Reader contract ──────────────────────────────────────────────────

/// One page of an already-materialized activity-log document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Raw text lines in reading order.
    #[serde(default)]
    pub text_lines: Vec<String>,
    /// Raw table rows (each an ordered list of cell strings).
    #[serde(default)]
    pub table_rows: Vec<Vec<String>>,
    /// Optional vertical position of each text line, parallel to `text_lines`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub line_tops: Vec<f64>,
}

impl Page {
    /// Build a text-only page by splitting `text` on line breaks.
    pub fn from_text(text: &str) -> Self {
        Self {
            text_lines: text.lines().map(|l| l.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Build a table-only page.
    pub fn from_rows(rows: Vec<Vec<String>>) -> Self {
        Self {
            table_rows: rows,
            ..Self::default()
        }
    }

    /// `true` when the page carries neither text nor table rows.
    pub fn is_empty(&self) -> bool {
        self.text_lines.iter().all(|l| l.trim().is_empty())
            && self
                .table_rows
                .iter()
                .all(|row| row.iter().all(|c| c.trim().is_empty()))
    }
}

/// A whole document as handed over by the Document Reader.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Free-form document metadata (title, author, producer, ...).
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// Pages in document order.
    pub pages: Vec<Page>,
}

impl Document {
    pub fn new(pages: Vec<Page>) -> Self {
        Self {
            metadata: BTreeMap::new(),
            pages,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

// ── Raw units ─────────────────────────────────────────────────────────────────

/// Where a unit's content came from on its page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSource {
    Text,
    Table,
}

/// Position of a unit inside the source document (0-based internally).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitLocation {
    /// Page index.
    pub page: usize,
    /// Index of the first text line or table row of the unit on that page.
    pub line: usize,
    pub source: UnitSource,
}

impl UnitLocation {
    pub fn new(page: usize, line: usize, source: UnitSource) -> Self {
        Self { page, line, source }
    }
}

impl fmt::Display for UnitLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.source {
            UnitSource::Text => "line",
            UnitSource::Table => "row",
        };
        write!(f, "page {}, {} {}", self.page + 1, kind, self.line + 1)
    }
}

/// A candidate chunk of source text believed to describe one learning event.
#[derive(Debug, Clone, PartialEq)]
pub struct RawUnit {
    pub location: UnitLocation,
    /// Approximate vertical position of the first line, when the reader has one.
    pub top: Option<f64>,
    /// Text lines (text units) or cells (table units), in order.
    pub tokens: Vec<String>,
    /// Set when the unit was stitched together across a page break.
    pub merged_across_pages: bool,
}

impl RawUnit {
    pub fn new(location: UnitLocation, tokens: Vec<String>) -> Self {
        Self {
            location,
            top: None,
            tokens,
            merged_across_pages: false,
        }
    }

    pub fn source(&self) -> UnitSource {
        self.location.source
    }

    /// All non-blank tokens joined by single spaces.
    pub fn text(&self) -> String {
        self.tokens
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ── Categorical fields ────────────────────────────────────────────────────────

/// Category of a learning activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TaskType {
    Quiz,
    Lesson,
    Review,
    Multistep,
    Placement,
    Unknown,
}

impl TaskType {
    pub const ALL: [TaskType; 6] = [
        TaskType::Quiz,
        TaskType::Lesson,
        TaskType::Review,
        TaskType::Multistep,
        TaskType::Placement,
        TaskType::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Quiz => "Quiz",
            TaskType::Lesson => "Lesson",
            TaskType::Review => "Review",
            TaskType::Multistep => "Multistep",
            TaskType::Placement => "Placement",
            TaskType::Unknown => "Unknown",
        }
    }

    /// Case-insensitive lookup by canonical name.
    pub fn from_name(name: &str) -> Option<TaskType> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quality marker attached to a record whose heuristics were uncertain or
/// whose source data was inconsistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyFlag {
    /// The date was inherited from an earlier unit.
    InferredDate,
    /// No task keyword was found; task type defaulted to `Unknown`.
    UnknownTaskType,
    /// `xp_possible` is lower than `xp_earned`.
    XpExceedsPossible,
    /// The course name exceeded the configured length and was cut.
    TruncatedCourseName,
    /// The unit was stitched together across a page break.
    MergedAcrossPages,
}

impl AnomalyFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyFlag::InferredDate => "inferred_date",
            AnomalyFlag::UnknownTaskType => "unknown_task_type",
            AnomalyFlag::XpExceedsPossible => "xp_exceeds_possible",
            AnomalyFlag::TruncatedCourseName => "truncated_course_name",
            AnomalyFlag::MergedAcrossPages => "merged_across_pages",
        }
    }
}

impl fmt::Display for AnomalyFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Drafts and records ────────────────────────────────────────────────────────

/// Best-effort field set extracted from one [`RawUnit`].
///
/// Unset fields mean "could not be determined", never zero.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDraft {
    pub location: UnitLocation,
    pub date: Option<NaiveDate>,
    pub course_name: Option<String>,
    pub task_type: Option<TaskType>,
    pub description: Option<String>,
    pub xp_earned: Option<f64>,
    pub xp_possible: Option<f64>,
    pub flags: BTreeSet<AnomalyFlag>,
}

impl RecordDraft {
    pub fn new(location: UnitLocation) -> Self {
        Self {
            location,
            date: None,
            course_name: None,
            task_type: None,
            description: None,
            xp_earned: None,
            xp_possible: None,
            flags: BTreeSet::new(),
        }
    }
}

/// The canonical unit of learning activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseProgressRecord {
    pub date: NaiveDate,
    pub course_name: String,
    pub task_type: TaskType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub xp_earned: f64,
    #[serde(default)]
    pub xp_possible: Option<f64>,
    #[serde(default)]
    pub anomaly_flags: BTreeSet<AnomalyFlag>,
    pub location: UnitLocation,
}

impl CourseProgressRecord {
    /// `xp_earned / xp_possible` when `xp_possible > 0`, otherwise undefined.
    pub fn completion_ratio(&self) -> Option<f64> {
        match self.xp_possible {
            Some(possible) if possible > 0.0 => Some(self.xp_earned / possible),
            _ => None,
        }
    }

    pub fn has_flag(&self, flag: AnomalyFlag) -> bool {
        self.anomaly_flags.contains(&flag)
    }

    /// Whether the record may take part in completion-ratio aggregates.
    pub fn counts_toward_ratio(&self) -> bool {
        self.completion_ratio().is_some() && !self.has_flag(AnomalyFlag::XpExceedsPossible)
    }
}

// ── Diagnostics ───────────────────────────────────────────────────────────────

/// Fields a draft must carry to become a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MandatoryField {
    Date,
    CourseName,
    XpEarned,
}

impl fmt::Display for MandatoryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MandatoryField::Date => "date",
            MandatoryField::CourseName => "course_name",
            MandatoryField::XpEarned => "xp_earned",
        })
    }
}

/// Why a unit was discarded or flagged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// The unit yielded no usable field at all.
    MalformedUnit { excerpt: String },
    /// The draft lacked one or more mandatory fields.
    MissingMandatoryField { fields: Vec<MandatoryField> },
    /// `xp_possible < xp_earned`; the record was kept and flagged.
    FieldInvariantViolation { xp_earned: f64, xp_possible: f64 },
    /// Same event already accepted at `first`.
    DuplicateRecord { first: UnitLocation },
    /// A date header's stated total disagrees with the accepted records.
    DailyTotalMismatch {
        date: NaiveDate,
        stated: f64,
        observed: f64,
    },
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::MalformedUnit { excerpt } => {
                write!(f, "malformed unit: \"{}\"", excerpt)
            }
            DiagnosticKind::MissingMandatoryField { fields } => {
                let names: Vec<String> = fields.iter().map(|x| x.to_string()).collect();
                write!(f, "missing mandatory field(s): {}", names.join(", "))
            }
            DiagnosticKind::FieldInvariantViolation {
                xp_earned,
                xp_possible,
            } => write!(
                f,
                "xp_earned {} exceeds xp_possible {}",
                xp_earned, xp_possible
            ),
            DiagnosticKind::DuplicateRecord { first } => {
                write!(f, "duplicate of record at {}", first)
            }
            DiagnosticKind::DailyTotalMismatch {
                date,
                stated,
                observed,
            } => write!(
                f,
                "daily total for {} states {} XP but records sum to {} XP",
                date, stated, observed
            ),
        }
    }
}

/// One `{unit_location, reason}` entry of the diagnostics report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub location: UnitLocation,
    #[serde(flatten)]
    pub kind: DiagnosticKind,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.kind)
    }
}

/// Discards (candidates that did not become records) and anomalies (records
/// kept but worth surfacing).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticReport {
    #[serde(default)]
    pub discards: Vec<Diagnostic>,
    #[serde(default)]
    pub anomalies: Vec<Diagnostic>,
}

impl DiagnosticReport {
    pub fn is_empty(&self) -> bool {
        self.discards.is_empty() && self.anomalies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.discards.len() + self.anomalies.len()
    }

    /// Discards first, then anomalies.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.discards.iter().chain(self.anomalies.iter())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
