//! Turns record drafts into validated [`CourseProgressRecord`]s.
//!
//! Problems are never fatal: drafts missing mandatory fields and repeated
//! events are discarded, inconsistent XP values are kept with a flag, and
//! every decision is written to the [`DiagnosticReport`].

use std::collections::BTreeMap;

use analyzer_core::models::{
    AnomalyFlag, CourseProgressRecord, Diagnostic, DiagnosticKind, DiagnosticReport,
    MandatoryField, RawUnit, RecordDraft, TaskType, UnitLocation,
};
use chrono::NaiveDate;
use tracing::{debug, warn};

/// Longest excerpt of a malformed unit kept in its diagnostic.
const EXCERPT_CHARS: usize = 80;

/// Tolerance when comparing a stated daily total with the record sum.
const TOTAL_EPSILON: f64 = 1e-6;

/// Identity of a learning event for duplicate detection. XP values are
/// compared by bit pattern so the key is totally ordered.
type EventKey = (NaiveDate, String, TaskType, u64, Option<u64>);

/// Accepted records and everything that was discarded or flagged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationOutcome {
    pub records: Vec<CourseProgressRecord>,
    pub report: DiagnosticReport,
}

/// One daily total stated by a date header.
#[derive(Debug, Clone, Copy)]
struct StatedTotal {
    date: NaiveDate,
    stated: f64,
    location: UnitLocation,
}

#[derive(Debug, Default)]
pub struct RecordValidator {
    records: Vec<CourseProgressRecord>,
    seen: BTreeMap<EventKey, UnitLocation>,
    stated_totals: Vec<StatedTotal>,
    report: DiagnosticReport,
}

impl RecordValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate one draft; returns the accepted record, if any.
    pub fn validate(&mut self, draft: RecordDraft) -> Option<CourseProgressRecord> {
        let location = draft.location;

        let mut missing = Vec::new();
        if draft.date.is_none() {
            missing.push(MandatoryField::Date);
        }
        if draft.course_name.is_none() {
            missing.push(MandatoryField::CourseName);
        }
        if draft.xp_earned.is_none() {
            missing.push(MandatoryField::XpEarned);
        }
        let (Some(date), Some(course_name), Some(xp_earned)) =
            (draft.date, draft.course_name, draft.xp_earned)
        else {
            warn!(%location, ?missing, "discarding draft with missing fields");
            self.report.discards.push(Diagnostic {
                location,
                kind: DiagnosticKind::MissingMandatoryField { fields: missing },
            });
            return None;
        };

        let mut flags = draft.flags;
        let task_type = match draft.task_type {
            Some(t) => t,
            None => {
                flags.insert(AnomalyFlag::UnknownTaskType);
                TaskType::Unknown
            }
        };

        let key: EventKey = (
            date,
            course_name.clone(),
            task_type,
            xp_earned.to_bits(),
            draft.xp_possible.map(f64::to_bits),
        );
        if let Some(first) = self.seen.get(&key) {
            warn!(%location, first = %first, "discarding duplicate record");
            self.report.discards.push(Diagnostic {
                location,
                kind: DiagnosticKind::DuplicateRecord { first: *first },
            });
            return None;
        }

        if let Some(xp_possible) = draft.xp_possible {
            if xp_possible < xp_earned {
                flags.insert(AnomalyFlag::XpExceedsPossible);
                self.report.anomalies.push(Diagnostic {
                    location,
                    kind: DiagnosticKind::FieldInvariantViolation {
                        xp_earned,
                        xp_possible,
                    },
                });
            }
        }

        let record = CourseProgressRecord {
            date,
            course_name,
            task_type,
            description: draft.description,
            xp_earned,
            xp_possible: draft.xp_possible,
            anomaly_flags: flags,
            location,
        };
        debug!(%location, course = %record.course_name, xp = record.xp_earned, "accepted record");
        self.seen.insert(key, location);
        self.records.push(record.clone());
        Some(record)
    }

    /// Record a unit from which nothing could be extracted.
    pub fn note_malformed(&mut self, unit: &RawUnit) {
        let excerpt: String = unit.text().chars().take(EXCERPT_CHARS).collect();
        warn!(location = %unit.location, excerpt = %excerpt, "discarding malformed unit");
        self.report.discards.push(Diagnostic {
            location: unit.location,
            kind: DiagnosticKind::MalformedUnit { excerpt },
        });
    }

    /// Remember a daily total stated by a date header for reconciliation.
    pub fn note_daily_total(&mut self, date: NaiveDate, stated: f64, location: UnitLocation) {
        self.stated_totals.push(StatedTotal {
            date,
            stated,
            location,
        });
    }

    /// Reconcile stated daily totals and hand back the results.
    pub fn finish(mut self) -> ValidationOutcome {
        let mut per_day: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
        for record in &self.records {
            per_day.entry(record.date).or_default().push(record.xp_earned);
        }

        for total in &self.stated_totals {
            let observed = per_day
                .get(&total.date)
                .map(|values| canonical_sum(values))
                .unwrap_or(0.0);
            if (observed - total.stated).abs() > TOTAL_EPSILON {
                debug!(
                    date = %total.date,
                    stated = total.stated,
                    observed,
                    "daily total mismatch"
                );
                self.report.anomalies.push(Diagnostic {
                    location: total.location,
                    kind: DiagnosticKind::DailyTotalMismatch {
                        date: total.date,
                        stated: total.stated,
                        observed,
                    },
                });
            }
        }

        ValidationOutcome {
            records: self.records,
            report: self.report,
        }
    }
}

/// Sum in ascending order so the result does not depend on input order.
pub(crate) fn canonical_sum(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted.iter().sum()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use analyzer_core::models::UnitSource;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn loc(line: usize) -> UnitLocation {
        UnitLocation::new(0, line, UnitSource::Text)
    }

    fn full_draft(line: usize, earned: f64, possible: Option<f64>) -> RecordDraft {
        let mut d = RecordDraft::new(loc(line));
        d.date = Some(ymd(2025, 1, 15));
        d.course_name = Some("4th Grade Math".to_string());
        d.task_type = Some(TaskType::Quiz);
        d.xp_earned = Some(earned);
        d.xp_possible = possible;
        d
    }

    // ── mandatory fields ──────────────────────────────────────────────────────

    #[test]
    fn test_complete_draft_accepted() {
        let mut v = RecordValidator::new();
        let record = v.validate(full_draft(0, 25.0, Some(30.0))).unwrap();
        assert_eq!(record.course_name, "4th Grade Math");
        assert!(record.anomaly_flags.is_empty());

        let outcome = v.finish();
        assert_eq!(outcome.records.len(), 1);
        assert!(outcome.report.is_empty());
    }

    #[test]
    fn test_missing_fields_listed_and_discarded() {
        let mut v = RecordValidator::new();
        let mut d = RecordDraft::new(loc(3));
        d.course_name = Some("Algebra".to_string());
        assert!(v.validate(d).is_none());

        let outcome = v.finish();
        assert!(outcome.records.is_empty());
        assert_eq!(
            outcome.report.discards[0].kind,
            DiagnosticKind::MissingMandatoryField {
                fields: vec![MandatoryField::Date, MandatoryField::XpEarned]
            }
        );
        assert_eq!(outcome.report.discards[0].location, loc(3));
    }

    #[test]
    fn test_zero_xp_is_a_value() {
        let mut v = RecordValidator::new();
        assert!(v.validate(full_draft(0, 0.0, Some(10.0))).is_some());
    }

    // ── defaults and flags ────────────────────────────────────────────────────

    #[test]
    fn test_missing_task_type_defaults_to_unknown() {
        let mut v = RecordValidator::new();
        let mut d = full_draft(0, 10.0, None);
        d.task_type = None;
        let record = v.validate(d).unwrap();
        assert_eq!(record.task_type, TaskType::Unknown);
        assert!(record.has_flag(AnomalyFlag::UnknownTaskType));
        assert_eq!(record.xp_possible, None);
    }

    #[test]
    fn test_xp_exceeding_possible_flagged_not_corrected() {
        let mut v = RecordValidator::new();
        let record = v.validate(full_draft(0, 18.0, Some(15.0))).unwrap();
        assert_eq!(record.xp_earned, 18.0);
        assert_eq!(record.xp_possible, Some(15.0));
        assert!(record.has_flag(AnomalyFlag::XpExceedsPossible));

        let outcome = v.finish();
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(
            outcome.report.anomalies[0].kind,
            DiagnosticKind::FieldInvariantViolation {
                xp_earned: 18.0,
                xp_possible: 15.0
            }
        );
    }

    #[test]
    fn test_draft_flags_carried_over() {
        let mut v = RecordValidator::new();
        let mut d = full_draft(0, 5.0, Some(5.0));
        d.flags.insert(AnomalyFlag::InferredDate);
        let record = v.validate(d).unwrap();
        assert!(record.has_flag(AnomalyFlag::InferredDate));
    }

    // ── duplicates ────────────────────────────────────────────────────────────

    #[test]
    fn test_duplicate_collapsed_to_first() {
        let mut v = RecordValidator::new();
        assert!(v.validate(full_draft(1, 25.0, Some(30.0))).is_some());
        assert!(v.validate(full_draft(4, 25.0, Some(30.0))).is_none());

        let outcome = v.finish();
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].location, loc(1));
        assert_eq!(
            outcome.report.discards[0],
            Diagnostic {
                location: loc(4),
                kind: DiagnosticKind::DuplicateRecord { first: loc(1) }
            }
        );
    }

    #[test]
    fn test_different_possible_is_not_duplicate() {
        let mut v = RecordValidator::new();
        assert!(v.validate(full_draft(1, 25.0, Some(30.0))).is_some());
        assert!(v.validate(full_draft(2, 25.0, None)).is_some());
        assert_eq!(v.finish().records.len(), 2);
    }

    // ── malformed units ───────────────────────────────────────────────────────

    #[test]
    fn test_note_malformed_truncates_excerpt() {
        let mut v = RecordValidator::new();
        let unit = RawUnit::new(loc(7), vec!["x".repeat(200)]);
        v.note_malformed(&unit);

        let outcome = v.finish();
        match &outcome.report.discards[0].kind {
            DiagnosticKind::MalformedUnit { excerpt } => assert_eq!(excerpt.len(), EXCERPT_CHARS),
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    // ── daily totals ──────────────────────────────────────────────────────────

    #[test]
    fn test_daily_total_matching_is_silent() {
        let mut v = RecordValidator::new();
        v.note_daily_total(ymd(2025, 1, 15), 28.0, loc(0));
        v.validate(full_draft(1, 18.0, Some(15.0)));
        let mut lesson = full_draft(2, 10.0, Some(10.0));
        lesson.task_type = Some(TaskType::Lesson);
        v.validate(lesson);

        let outcome = v.finish();
        assert!(!outcome
            .report
            .anomalies
            .iter()
            .any(|d| matches!(d.kind, DiagnosticKind::DailyTotalMismatch { .. })));
    }

    #[test]
    fn test_daily_total_mismatch_reported() {
        let mut v = RecordValidator::new();
        v.note_daily_total(ymd(2025, 1, 15), 120.0, loc(0));
        v.validate(full_draft(1, 25.0, Some(30.0)));

        let outcome = v.finish();
        assert_eq!(
            outcome.report.anomalies,
            vec![Diagnostic {
                location: loc(0),
                kind: DiagnosticKind::DailyTotalMismatch {
                    date: ymd(2025, 1, 15),
                    stated: 120.0,
                    observed: 25.0
                }
            }]
        );
        assert_eq!(outcome.records.len(), 1);
    }

    #[test]
    fn test_canonical_sum_order_independent() {
        let a = canonical_sum(&[0.1, 0.2, 0.3, 1e16, -1e16]);
        let b = canonical_sum(&[-1e16, 0.3, 1e16, 0.2, 0.1]);
        assert_eq!(a.to_bits(), b.to_bits());
    }
}
