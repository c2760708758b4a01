//! Summary statistics over a set of course progress records.
//!
//! Everything is recomputed from scratch on every call. Records are put into
//! a canonical order first, so neither the values nor the floating-point
//! summation order depend on the order the records were supplied in.

use std::collections::{BTreeMap, BTreeSet};

use analyzer_core::models::{CourseProgressRecord, TaskType};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Days on each side of the recent-trend comparison.
pub const TREND_WINDOW_DAYS: usize = 7;

/// Window of the efficiency moving average, in active days.
pub const EFFICIENCY_WINDOW: usize = 7;

// ── Output types ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// One calendar day of the zero-filled daily series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub xp: f64,
    pub task_count: usize,
    pub cumulative_xp: f64,
    /// Course with the most XP that day; ties go to the lexically first name.
    pub dominant_course: Option<String>,
}

/// Count, XP and completion figures for one course or task type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    pub count: usize,
    pub total_xp: f64,
    pub average_xp: f64,
    pub completion_ratio: Option<f64>,
    /// Records per task type (course groups only).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub task_counts: BTreeMap<TaskType, usize>,
}

/// XP within one ISO week or calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodStats {
    /// `YYYY-Www` or `YYYY-MM`.
    pub period_key: String,
    pub total_xp: f64,
    pub task_count: usize,
    /// Mean XP per record.
    pub average_xp: f64,
    pub active_days: usize,
}

/// A maximal run of consecutive active days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streak {
    pub length: usize,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DayValue {
    pub date: NaiveDate,
    pub xp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdayStats {
    pub weekday: String,
    pub active_days: usize,
    pub total_xp: f64,
    /// Mean XP over the active days falling on this weekday.
    pub average_daily_xp: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendStatus {
    Ok,
    #[default]
    InsufficientData,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Up,
    Down,
    #[default]
    Flat,
}

/// Last week of the daily series against the week before it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecentTrend {
    pub status: TrendStatus,
    pub recent_xp: f64,
    pub previous_xp: f64,
    /// Percent change; undefined when the previous week had no XP.
    pub change_percent: Option<f64>,
    pub direction: TrendDirection,
}

/// Completion rate of one active day with its moving average.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyPoint {
    pub date: NaiveDate,
    /// Percent of possible XP earned that day.
    pub completion_rate: Option<f64>,
    pub moving_average: Option<f64>,
}

/// Aggregate view of a record set. Derived data; never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub total_xp: f64,
    pub total_possible: f64,
    pub record_count: usize,
    pub study_days: usize,
    pub date_range: Option<DateRange>,
    pub total_days: usize,
    pub completion_ratio: Option<f64>,
    pub daily_average: f64,
    pub weekly_average: f64,
    pub daily_series: Vec<DailyPoint>,
    pub per_course: BTreeMap<String, GroupStats>,
    pub per_task: BTreeMap<TaskType, GroupStats>,
    pub weekly: Vec<PeriodStats>,
    pub monthly: Vec<PeriodStats>,
    pub longest_streak: Option<Streak>,
    pub current_streak: Option<Streak>,
    pub best_day: Option<DayValue>,
    pub worst_day: Option<DayValue>,
    pub weekday_distribution: Vec<WeekdayStats>,
    pub recent_trend: RecentTrend,
    pub efficiency_series: Vec<EfficiencyPoint>,
}

// ── Accumulators ──────────────────────────────────────────────────────────────

/// Running totals for a group of records.
#[derive(Debug, Default)]
struct GroupAcc {
    count: usize,
    total_xp: f64,
    ratio_earned: f64,
    ratio_possible: f64,
    ratio_count: usize,
    task_counts: BTreeMap<TaskType, usize>,
}

impl GroupAcc {
    fn add(&mut self, record: &CourseProgressRecord) {
        self.count += 1;
        self.total_xp += record.xp_earned;
        if record.counts_toward_ratio() {
            if let Some(possible) = record.xp_possible {
                self.ratio_earned += record.xp_earned;
                self.ratio_possible += possible;
                self.ratio_count += 1;
            }
        }
        *self.task_counts.entry(record.task_type).or_default() += 1;
    }

    fn completion_ratio(&self) -> Option<f64> {
        (self.ratio_count > 0 && self.ratio_possible > 0.0)
            .then(|| self.ratio_earned / self.ratio_possible)
    }

    fn finish(self, with_task_counts: bool) -> GroupStats {
        GroupStats {
            count: self.count,
            total_xp: self.total_xp,
            average_xp: mean(self.total_xp, self.count),
            completion_ratio: self.completion_ratio(),
            task_counts: if with_task_counts {
                self.task_counts
            } else {
                BTreeMap::new()
            },
        }
    }
}

/// Running totals for one calendar day.
#[derive(Debug, Default)]
struct DayAcc {
    xp: f64,
    count: usize,
    per_course: BTreeMap<String, f64>,
    group: GroupAcc,
}

#[derive(Debug, Default)]
struct PeriodAcc {
    total_xp: f64,
    count: usize,
    days: BTreeSet<NaiveDate>,
}

// ── Aggregator ────────────────────────────────────────────────────────────────

/// Stateless helper computing [`SummaryStatistics`].
pub struct Aggregator;

impl Aggregator {
    pub fn summarize(records: &[CourseProgressRecord]) -> SummaryStatistics {
        let sorted = canonical_order(records);
        if sorted.is_empty() {
            return SummaryStatistics::default();
        }

        let mut overall = GroupAcc::default();
        let mut total_possible = 0.0;
        let mut days: BTreeMap<NaiveDate, DayAcc> = BTreeMap::new();
        let mut courses: BTreeMap<String, GroupAcc> = BTreeMap::new();
        let mut tasks: BTreeMap<TaskType, GroupAcc> = BTreeMap::new();

        for record in &sorted {
            overall.add(record);
            total_possible += record.xp_possible.unwrap_or(0.0);

            let day = days.entry(record.date).or_default();
            day.xp += record.xp_earned;
            day.count += 1;
            *day.per_course.entry(record.course_name.clone()).or_default() += record.xp_earned;
            day.group.add(record);

            courses
                .entry(record.course_name.clone())
                .or_default()
                .add(record);
            tasks.entry(record.task_type).or_default().add(record);
        }

        let (Some(&start), Some(&end)) = (days.keys().next(), days.keys().next_back()) else {
            return SummaryStatistics::default();
        };
        let total_xp = overall.total_xp;
        let study_days = days.len();
        let daily_series = daily_series(&days, start, end);
        let weeks_spanned = daily_series
            .iter()
            .map(|p| (p.date.iso_week().year(), p.date.iso_week().week()))
            .collect::<BTreeSet<_>>()
            .len();
        let (longest_streak, current_streak) = streaks(&days);

        SummaryStatistics {
            total_xp,
            total_possible,
            record_count: sorted.len(),
            study_days,
            date_range: Some(DateRange { start, end }),
            total_days: daily_series.len(),
            completion_ratio: overall.completion_ratio(),
            daily_average: mean(total_xp, study_days),
            weekly_average: mean(total_xp, weeks_spanned),
            per_course: courses
                .into_iter()
                .map(|(k, acc)| (k, acc.finish(true)))
                .collect(),
            per_task: tasks
                .into_iter()
                .map(|(k, acc)| (k, acc.finish(false)))
                .collect(),
            weekly: Self::aggregate_by_period(&sorted, |d| d.format("%G-W%V").to_string()),
            monthly: Self::aggregate_by_period(&sorted, |d| d.format("%Y-%m").to_string()),
            longest_streak,
            current_streak,
            best_day: extreme_day(&days, |candidate, best| candidate > best),
            worst_day: extreme_day(&days, |candidate, best| candidate < best),
            weekday_distribution: weekday_distribution(&days),
            recent_trend: recent_trend(&daily_series),
            efficiency_series: efficiency_series(&days),
            daily_series,
        }
    }

    /// Group records by a period key derived from their date, sorted by key.
    fn aggregate_by_period(
        records: &[&CourseProgressRecord],
        key_fn: impl Fn(NaiveDate) -> String,
    ) -> Vec<PeriodStats> {
        let mut map: BTreeMap<String, PeriodAcc> = BTreeMap::new();
        for record in records {
            let acc = map.entry(key_fn(record.date)).or_default();
            acc.total_xp += record.xp_earned;
            acc.count += 1;
            acc.days.insert(record.date);
        }
        map.into_iter()
            .map(|(period_key, acc)| PeriodStats {
                period_key,
                total_xp: acc.total_xp,
                task_count: acc.count,
                average_xp: mean(acc.total_xp, acc.count),
                active_days: acc.days.len(),
            })
            .collect()
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn mean(total: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

/// Records sorted by every field that identifies them.
fn canonical_order(records: &[CourseProgressRecord]) -> Vec<&CourseProgressRecord> {
    let mut sorted: Vec<&CourseProgressRecord> = records.iter().collect();
    sorted.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.course_name.cmp(&b.course_name))
            .then_with(|| a.task_type.cmp(&b.task_type))
            .then_with(|| a.xp_earned.total_cmp(&b.xp_earned))
            .then_with(|| {
                a.xp_possible
                    .unwrap_or(-1.0)
                    .total_cmp(&b.xp_possible.unwrap_or(-1.0))
            })
            .then_with(|| a.description.cmp(&b.description))
            .then_with(|| a.location.cmp(&b.location))
    });
    sorted
}

fn daily_series(days: &BTreeMap<NaiveDate, DayAcc>, start: NaiveDate, end: NaiveDate) -> Vec<DailyPoint> {
    let mut series = Vec::new();
    let mut cumulative = 0.0;
    let mut date = start;
    while date <= end {
        let point = match days.get(&date) {
            Some(day) => {
                cumulative += day.xp;
                DailyPoint {
                    date,
                    xp: day.xp,
                    task_count: day.count,
                    cumulative_xp: cumulative,
                    dominant_course: dominant_course(&day.per_course),
                }
            }
            None => DailyPoint {
                date,
                xp: 0.0,
                task_count: 0,
                cumulative_xp: cumulative,
                dominant_course: None,
            },
        };
        series.push(point);
        date += Duration::days(1);
    }
    series
}

fn dominant_course(per_course: &BTreeMap<String, f64>) -> Option<String> {
    let mut best: Option<(&String, f64)> = None;
    for (name, xp) in per_course {
        if best.map_or(true, |(_, top)| *xp > top) {
            best = Some((name, *xp));
        }
    }
    best.map(|(name, _)| name.clone())
}

/// Longest run (earliest on ties) and the run ending on the latest active day.
fn streaks(days: &BTreeMap<NaiveDate, DayAcc>) -> (Option<Streak>, Option<Streak>) {
    let mut runs: Vec<Streak> = Vec::new();
    for &date in days.keys() {
        match runs.last_mut() {
            Some(run) if run.end + Duration::days(1) == date => {
                run.end = date;
                run.length += 1;
            }
            _ => runs.push(Streak {
                length: 1,
                start: date,
                end: date,
            }),
        }
    }

    let mut longest: Option<Streak> = None;
    for run in &runs {
        if longest.map_or(true, |l| run.length > l.length) {
            longest = Some(*run);
        }
    }
    (longest, runs.last().copied())
}

/// Day with the extreme non-zero XP under `better`; ties keep the earliest.
fn extreme_day(
    days: &BTreeMap<NaiveDate, DayAcc>,
    better: impl Fn(f64, f64) -> bool,
) -> Option<DayValue> {
    let mut found: Option<DayValue> = None;
    for (&date, day) in days {
        if day.xp == 0.0 {
            continue;
        }
        if found.map_or(true, |f| better(day.xp, f.xp)) {
            found = Some(DayValue { date, xp: day.xp });
        }
    }
    found
}

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

fn weekday_distribution(days: &BTreeMap<NaiveDate, DayAcc>) -> Vec<WeekdayStats> {
    WEEKDAYS
        .iter()
        .map(|&wd| {
            let (active_days, total_xp) = days
                .iter()
                .filter(|(date, _)| date.weekday() == wd)
                .fold((0usize, 0.0), |(n, xp), (_, day)| (n + 1, xp + day.xp));
            WeekdayStats {
                weekday: weekday_name(wd).to_string(),
                active_days,
                total_xp,
                average_daily_xp: mean(total_xp, active_days),
            }
        })
        .collect()
}

fn recent_trend(series: &[DailyPoint]) -> RecentTrend {
    if series.len() < TREND_WINDOW_DAYS * 2 {
        return RecentTrend::default();
    }
    let n = series.len();
    let recent_xp: f64 = series[n - TREND_WINDOW_DAYS..].iter().map(|p| p.xp).sum();
    let previous_xp: f64 = series[n - 2 * TREND_WINDOW_DAYS..n - TREND_WINDOW_DAYS]
        .iter()
        .map(|p| p.xp)
        .sum();
    let change_percent =
        (previous_xp > 0.0).then(|| (recent_xp - previous_xp) / previous_xp * 100.0);
    let direction = if recent_xp > previous_xp {
        TrendDirection::Up
    } else if recent_xp < previous_xp {
        TrendDirection::Down
    } else {
        TrendDirection::Flat
    };
    RecentTrend {
        status: TrendStatus::Ok,
        recent_xp,
        previous_xp,
        change_percent,
        direction,
    }
}

fn efficiency_series(days: &BTreeMap<NaiveDate, DayAcc>) -> Vec<EfficiencyPoint> {
    let rates: Vec<(NaiveDate, Option<f64>)> = days
        .iter()
        .map(|(&date, day)| (date, day.group.completion_ratio().map(|r| r * 100.0)))
        .collect();

    rates
        .iter()
        .enumerate()
        .map(|(i, &(date, completion_rate))| {
            let window_start = (i + 1).saturating_sub(EFFICIENCY_WINDOW);
            let defined: Vec<f64> = rates[window_start..=i]
                .iter()
                .filter_map(|(_, r)| *r)
                .collect();
            let moving_average =
                (!defined.is_empty()).then(|| defined.iter().sum::<f64>() / defined.len() as f64);
            EfficiencyPoint {
                date,
                completion_rate,
                moving_average,
            }
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use analyzer_core::models::{AnomalyFlag, UnitLocation, UnitSource};
    use std::collections::BTreeSet;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(
        date: NaiveDate,
        course: &str,
        task: TaskType,
        earned: f64,
        possible: Option<f64>,
    ) -> CourseProgressRecord {
        let mut flags = BTreeSet::new();
        if possible.is_some_and(|p| p < earned) {
            flags.insert(AnomalyFlag::XpExceedsPossible);
        }
        CourseProgressRecord {
            date,
            course_name: course.to_string(),
            task_type: task,
            description: None,
            xp_earned: earned,
            xp_possible: possible,
            anomaly_flags: flags,
            location: UnitLocation::new(0, 0, UnitSource::Text),
        }
    }

    /// Quiz 18/15 (flagged) and Lesson 10/10 on the same day.
    fn same_day_records() -> Vec<CourseProgressRecord> {
        let d = ymd(2025, 1, 15);
        vec![
            record(d, "4th Grade Math", TaskType::Quiz, 18.0, Some(15.0)),
            record(d, "4th Grade Math", TaskType::Lesson, 10.0, Some(10.0)),
        ]
    }

    // ── totals ────────────────────────────────────────────────────────────────

    #[test]
    fn test_empty_input() {
        let s = Aggregator::summarize(&[]);
        assert_eq!(s.total_xp, 0.0);
        assert_eq!(s.record_count, 0);
        assert_eq!(s.date_range, None);
        assert_eq!(s.completion_ratio, None);
        assert!(s.daily_series.is_empty());
        assert_eq!(s.longest_streak, None);
        assert_eq!(s.recent_trend.status, TrendStatus::InsufficientData);
    }

    #[test]
    fn test_totals_include_flagged_records() {
        let s = Aggregator::summarize(&same_day_records());
        assert_eq!(s.total_xp, 28.0);
        assert_eq!(s.total_possible, 25.0);
        assert_eq!(s.record_count, 2);
        assert_eq!(s.study_days, 1);
        assert_eq!(s.total_days, 1);
    }

    #[test]
    fn test_completion_ratio_excludes_flagged() {
        let s = Aggregator::summarize(&same_day_records());
        assert_eq!(s.completion_ratio, Some(1.0));
        assert_eq!(s.per_task[&TaskType::Quiz].completion_ratio, None);
        assert_eq!(s.per_task[&TaskType::Lesson].completion_ratio, Some(1.0));
    }

    #[test]
    fn test_completion_ratio_none_without_possible() {
        let d = ymd(2025, 1, 15);
        let s = Aggregator::summarize(&[record(d, "Algebra", TaskType::Placement, 35.0, None)]);
        assert_eq!(s.completion_ratio, None);
        assert_eq!(s.total_possible, 0.0);
    }

    // ── daily series ──────────────────────────────────────────────────────────

    #[test]
    fn test_daily_series_zero_fills_gaps() {
        let records = vec![
            record(ymd(2025, 1, 1), "A", TaskType::Quiz, 10.0, None),
            record(ymd(2025, 1, 2), "A", TaskType::Quiz, 5.0, None),
            record(ymd(2025, 1, 4), "A", TaskType::Quiz, 20.0, None),
        ];
        let s = Aggregator::summarize(&records);
        assert_eq!(s.total_days, 4);
        assert_eq!(s.study_days, 3);
        let xp: Vec<f64> = s.daily_series.iter().map(|p| p.xp).collect();
        assert_eq!(xp, vec![10.0, 5.0, 0.0, 20.0]);
        let cumulative: Vec<f64> = s.daily_series.iter().map(|p| p.cumulative_xp).collect();
        assert_eq!(cumulative, vec![10.0, 15.0, 15.0, 35.0]);
        assert_eq!(s.daily_series[2].dominant_course, None);
    }

    #[test]
    fn test_dominant_course_ties_by_name() {
        let d = ymd(2025, 1, 1);
        let records = vec![
            record(d, "Spanish", TaskType::Quiz, 10.0, None),
            record(d, "Algebra", TaskType::Quiz, 10.0, None),
            record(d, "Biology", TaskType::Quiz, 4.0, None),
        ];
        let s = Aggregator::summarize(&records);
        assert_eq!(s.daily_series[0].dominant_course.as_deref(), Some("Algebra"));
    }

    #[test]
    fn test_averages() {
        // Mon 2025-01-06 .. Sun 2025-01-19 spans two ISO weeks.
        let records = vec![
            record(ymd(2025, 1, 6), "A", TaskType::Quiz, 30.0, None),
            record(ymd(2025, 1, 19), "A", TaskType::Quiz, 10.0, None),
        ];
        let s = Aggregator::summarize(&records);
        assert_eq!(s.daily_average, 20.0);
        assert_eq!(s.weekly_average, 20.0);
    }

    // ── groups and periods ────────────────────────────────────────────────────

    #[test]
    fn test_per_course_task_counts() {
        let s = Aggregator::summarize(&same_day_records());
        let math = &s.per_course["4th Grade Math"];
        assert_eq!(math.count, 2);
        assert_eq!(math.total_xp, 28.0);
        assert_eq!(math.average_xp, 14.0);
        assert_eq!(math.task_counts[&TaskType::Quiz], 1);
        assert_eq!(math.task_counts[&TaskType::Lesson], 1);
        assert!(s.per_task[&TaskType::Quiz].task_counts.is_empty());
    }

    #[test]
    fn test_weekly_and_monthly_keys() {
        let records = vec![
            record(ymd(2024, 12, 30), "A", TaskType::Quiz, 10.0, None),
            record(ymd(2025, 1, 2), "A", TaskType::Quiz, 20.0, None),
            record(ymd(2025, 1, 6), "A", TaskType::Quiz, 6.0, None),
        ];
        let s = Aggregator::summarize(&records);
        let weekly: Vec<&str> = s.weekly.iter().map(|p| p.period_key.as_str()).collect();
        assert_eq!(weekly, vec!["2025-W01", "2025-W02"]);
        assert_eq!(s.weekly[0].total_xp, 30.0);
        assert_eq!(s.weekly[0].average_xp, 15.0);
        assert_eq!(s.weekly[0].active_days, 2);
        let monthly: Vec<&str> = s.monthly.iter().map(|p| p.period_key.as_str()).collect();
        assert_eq!(monthly, vec!["2024-12", "2025-01"]);
    }

    // ── streaks and extremes ──────────────────────────────────────────────────

    #[test]
    fn test_streaks() {
        let dates = [
            ymd(2025, 1, 1),
            ymd(2025, 1, 2),
            ymd(2025, 1, 3),
            ymd(2025, 1, 5),
            ymd(2025, 1, 6),
        ];
        let records: Vec<_> = dates
            .iter()
            .map(|&d| record(d, "A", TaskType::Lesson, 5.0, Some(5.0)))
            .collect();
        let s = Aggregator::summarize(&records);
        assert_eq!(
            s.longest_streak,
            Some(Streak {
                length: 3,
                start: ymd(2025, 1, 1),
                end: ymd(2025, 1, 3)
            })
        );
        assert_eq!(
            s.current_streak,
            Some(Streak {
                length: 2,
                start: ymd(2025, 1, 5),
                end: ymd(2025, 1, 6)
            })
        );
    }

    #[test]
    fn test_longest_streak_tie_prefers_earliest() {
        let dates = [ymd(2025, 1, 1), ymd(2025, 1, 2), ymd(2025, 1, 4), ymd(2025, 1, 5)];
        let records: Vec<_> = dates
            .iter()
            .map(|&d| record(d, "A", TaskType::Lesson, 5.0, None))
            .collect();
        let s = Aggregator::summarize(&records);
        assert_eq!(s.longest_streak.unwrap().start, ymd(2025, 1, 1));
        assert_eq!(s.current_streak.unwrap().start, ymd(2025, 1, 4));
    }

    #[test]
    fn test_streak_length_bounded_by_study_days() {
        let records: Vec<_> = (1..=9)
            .filter(|d| d % 4 != 0)
            .map(|d| record(ymd(2025, 3, d), "A", TaskType::Quiz, 1.0, None))
            .collect();
        let s = Aggregator::summarize(&records);
        assert!(s.longest_streak.unwrap().length <= s.study_days);
    }

    #[test]
    fn test_best_and_worst_day_ties_earliest() {
        let records = vec![
            record(ymd(2025, 1, 1), "A", TaskType::Quiz, 10.0, None),
            record(ymd(2025, 1, 2), "A", TaskType::Quiz, 30.0, None),
            record(ymd(2025, 1, 3), "A", TaskType::Quiz, 10.0, None),
            record(ymd(2025, 1, 4), "A", TaskType::Quiz, 30.0, None),
            record(ymd(2025, 1, 5), "A", TaskType::Quiz, 0.0, None),
        ];
        let s = Aggregator::summarize(&records);
        assert_eq!(
            s.best_day,
            Some(DayValue {
                date: ymd(2025, 1, 2),
                xp: 30.0
            })
        );
        assert_eq!(
            s.worst_day,
            Some(DayValue {
                date: ymd(2025, 1, 1),
                xp: 10.0
            })
        );
    }

    // ── supplements ───────────────────────────────────────────────────────────

    #[test]
    fn test_weekday_distribution() {
        let records = vec![
            record(ymd(2025, 1, 6), "A", TaskType::Quiz, 10.0, None),
            record(ymd(2025, 1, 13), "A", TaskType::Quiz, 20.0, None),
            record(ymd(2025, 1, 13), "B", TaskType::Quiz, 6.0, None),
        ];
        let s = Aggregator::summarize(&records);
        assert_eq!(s.weekday_distribution.len(), 7);
        let monday = &s.weekday_distribution[0];
        assert_eq!(monday.weekday, "Monday");
        assert_eq!(monday.active_days, 2);
        assert_eq!(monday.total_xp, 36.0);
        assert_eq!(monday.average_daily_xp, 18.0);
        assert_eq!(s.weekday_distribution[1].active_days, 0);
    }

    #[test]
    fn test_recent_trend_insufficient_data() {
        let records = vec![
            record(ymd(2025, 1, 1), "A", TaskType::Quiz, 10.0, None),
            record(ymd(2025, 1, 13), "A", TaskType::Quiz, 10.0, None),
        ];
        let s = Aggregator::summarize(&records);
        assert_eq!(s.total_days, 13);
        assert_eq!(s.recent_trend.status, TrendStatus::InsufficientData);
    }

    #[test]
    fn test_recent_trend_compares_last_two_weeks() {
        let records = vec![
            record(ymd(2025, 1, 1), "A", TaskType::Quiz, 10.0, None),
            record(ymd(2025, 1, 8), "A", TaskType::Quiz, 15.0, None),
            record(ymd(2025, 1, 14), "A", TaskType::Quiz, 15.0, None),
        ];
        let s = Aggregator::summarize(&records);
        let t = &s.recent_trend;
        assert_eq!(t.status, TrendStatus::Ok);
        assert_eq!(t.recent_xp, 30.0);
        assert_eq!(t.previous_xp, 10.0);
        assert_eq!(t.change_percent, Some(200.0));
        assert_eq!(t.direction, TrendDirection::Up);
    }

    #[test]
    fn test_efficiency_moving_average() {
        let records = vec![
            record(ymd(2025, 1, 1), "A", TaskType::Quiz, 5.0, Some(10.0)),
            record(ymd(2025, 1, 2), "A", TaskType::Quiz, 10.0, Some(10.0)),
            record(ymd(2025, 1, 3), "A", TaskType::Placement, 35.0, None),
        ];
        let s = Aggregator::summarize(&records);
        let e = &s.efficiency_series;
        assert_eq!(e.len(), 3);
        assert_eq!(e[0].completion_rate, Some(50.0));
        assert_eq!(e[1].moving_average, Some(75.0));
        assert_eq!(e[2].completion_rate, None);
        assert_eq!(e[2].moving_average, Some(75.0));
    }

    // ── determinism ───────────────────────────────────────────────────────────

    #[test]
    fn test_input_order_does_not_matter() {
        let mut records = vec![
            record(ymd(2025, 1, 1), "A", TaskType::Quiz, 0.1, Some(1.0)),
            record(ymd(2025, 1, 3), "B", TaskType::Lesson, 0.2, Some(0.3)),
            record(ymd(2025, 1, 1), "C", TaskType::Review, 0.3, Some(0.7)),
            record(ymd(2025, 1, 2), "A", TaskType::Quiz, 1e-9, None),
        ];
        let forward = Aggregator::summarize(&records);
        records.reverse();
        let backward = Aggregator::summarize(&records);
        assert_eq!(forward, backward);
        assert_eq!(forward.total_xp.to_bits(), backward.total_xp.to_bits());
    }

    #[test]
    fn test_summary_is_idempotent() {
        let records = same_day_records();
        assert_eq!(Aggregator::summarize(&records), Aggregator::summarize(&records));
    }
}
