//! Writers for analysis results: a JSON document, a flat CSV table and the
//! plain-text summary printed by the CLI.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use analyzer_core::error::{AnalyzerError, Result};
use analyzer_core::formatting::{format_change, format_ratio, format_xp};
use analyzer_core::models::{CourseProgressRecord, DiagnosticReport};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::aggregator::{SummaryStatistics, TrendStatus};
use crate::analysis::AnalysisResult;

/// File-name marker of export files; document discovery skips these.
pub const EXPORT_MARKER: &str = "_xp_export";

// ── JSON document ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub total_records: usize,
    pub export_timestamp: String,
    pub source_file: Option<String>,
}

/// One activity as exported: the record plus its completion ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    #[serde(flatten)]
    pub record: CourseProgressRecord,
    pub completion_ratio: Option<f64>,
}

impl From<&CourseProgressRecord> for ExportRow {
    fn from(record: &CourseProgressRecord) -> Self {
        Self {
            record: record.clone(),
            completion_ratio: record.completion_ratio(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub metadata: ExportMetadata,
    pub statistics: SummaryStatistics,
    pub activities: Vec<ExportRow>,
    #[serde(default)]
    pub diagnostics: DiagnosticReport,
}

impl ExportDocument {
    pub fn from_result(result: &AnalysisResult, source_file: Option<&Path>) -> Self {
        Self {
            metadata: ExportMetadata {
                total_records: result.records.len(),
                export_timestamp: Local::now().to_rfc3339(),
                source_file: source_file.map(|p| p.display().to_string()),
            },
            statistics: result.summary.clone(),
            activities: result.records.iter().map(ExportRow::from).collect(),
            diagnostics: result.report.clone(),
        }
    }

    pub fn records(&self) -> Vec<CourseProgressRecord> {
        self.activities.iter().map(|row| row.record.clone()).collect()
    }
}

/// `<out_dir>/<stem>_xp_export.<extension>`.
pub fn export_path(input: &Path, out_dir: &Path, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "activity_log".to_string());
    out_dir.join(format!("{stem}{EXPORT_MARKER}.{extension}"))
}

pub fn write_json_export(document: &ExportDocument, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(document)?;
    write_atomic(path, json.as_bytes())?;
    info!(path = %path.display(), records = document.activities.len(), "wrote JSON export");
    Ok(())
}

pub fn read_json_export(path: &Path) -> Result<ExportDocument> {
    let content = std::fs::read_to_string(path).map_err(|source| AnalyzerError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&content)?)
}

// ── CSV ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    date: String,
    course_name: &'a str,
    task_type: &'static str,
    xp_earned: f64,
    xp_possible: Option<f64>,
    completion_ratio: Option<f64>,
    anomaly_flags: String,
}

impl<'a> From<&'a CourseProgressRecord> for CsvRow<'a> {
    fn from(record: &'a CourseProgressRecord) -> Self {
        Self {
            date: record.date.format("%Y-%m-%d").to_string(),
            course_name: &record.course_name,
            task_type: record.task_type.as_str(),
            xp_earned: record.xp_earned,
            xp_possible: record.xp_possible,
            completion_ratio: record.completion_ratio(),
            anomaly_flags: record
                .anomaly_flags
                .iter()
                .map(|f| f.as_str())
                .collect::<Vec<_>>()
                .join(";"),
        }
    }
}

/// Render records as CSV, one row per record in the given order.
pub fn records_to_csv(records: &[CourseProgressRecord]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer.serialize(CsvRow::from(record))?;
    }
    if records.is_empty() {
        writer.write_record([
            "date",
            "course_name",
            "task_type",
            "xp_earned",
            "xp_possible",
            "completion_ratio",
            "anomaly_flags",
        ])?;
    }
    writer
        .into_inner()
        .map_err(|e| AnalyzerError::Io(e.into_error()))
}

pub fn write_csv_export(records: &[CourseProgressRecord], path: &Path) -> Result<()> {
    let bytes = records_to_csv(records)?;
    write_atomic(path, &bytes)?;
    info!(path = %path.display(), records = records.len(), "wrote CSV export");
    Ok(())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

// ── Text summary ──────────────────────────────────────────────────────────────

/// Human-readable summary of the statistics and diagnostics.
pub fn build_text_summary(summary: &SummaryStatistics, report: &DiagnosticReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Summary ===");
    let _ = writeln!(out, "Total records: {}", summary.record_count);
    if summary.record_count == 0 {
        let _ = writeln!(out, "No activity found.");
        return out;
    }
    let _ = writeln!(out, "Total XP earned: {}", format_xp(summary.total_xp));
    let _ = writeln!(out, "Completion: {}", format_ratio(summary.completion_ratio));
    if let Some(range) = summary.date_range {
        let _ = writeln!(out, "Date range: {} to {}", range.start, range.end);
    }
    let _ = writeln!(
        out,
        "Study days: {} of {} ({} per study day)",
        summary.study_days,
        summary.total_days,
        format_xp(summary.daily_average)
    );
    let _ = writeln!(out, "Unique courses: {}", summary.per_course.len());
    let tasks: Vec<&str> = summary.per_task.keys().map(|t| t.as_str()).collect();
    let _ = writeln!(out, "Task types: {}", tasks.join(", "));
    if let Some(streak) = summary.longest_streak {
        let _ = writeln!(
            out,
            "Longest streak: {} days ({} to {})",
            streak.length, streak.start, streak.end
        );
    }
    if let Some(best) = summary.best_day {
        let _ = writeln!(out, "Best day: {} ({})", best.date, format_xp(best.xp));
    }
    let trend = &summary.recent_trend;
    if trend.status == TrendStatus::Ok {
        let change = trend
            .change_percent
            .map(format_change)
            .unwrap_or_else(|| "n/a".to_string());
        let _ = writeln!(
            out,
            "Last 7 days: {} ({} vs previous week)",
            format_xp(trend.recent_xp),
            change
        );
    }

    if !report.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Diagnostics: {} discarded, {} anomalies",
            report.discards.len(),
            report.anomalies.len()
        );
        for diagnostic in report.iter() {
            let _ = writeln!(out, "  {diagnostic}");
        }
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{analyze_pages, AnalysisOptions};
    use analyzer_core::models::Page;
    use tempfile::TempDir;

    fn sample_result() -> AnalysisResult {
        let page = Page::from_text(
            "Jan 15, 2025  4th Grade Math  Quiz  25/30\n\
             Jan 15, 2025  Algebra  Lesson  18/15\n\
             Jan 16, 2025  Spanish  10 XP",
        );
        analyze_pages(&[page], &AnalysisOptions::default()).unwrap()
    }

    // ── paths ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_export_path_uses_marker() {
        let path = export_path(Path::new("/data/log.json"), Path::new("/out"), "csv");
        assert_eq!(path, PathBuf::from("/out/log_xp_export.csv"));
    }

    // ── JSON ──────────────────────────────────────────────────────────────────

    #[test]
    fn test_json_export_read_back() {
        let dir = TempDir::new().unwrap();
        let result = sample_result();
        let doc = ExportDocument::from_result(&result, Some(Path::new("log.json")));
        let path = dir.path().join("nested").join("log_xp_export.json");
        write_json_export(&doc, &path).unwrap();

        let loaded = read_json_export(&path).unwrap();
        assert_eq!(loaded.metadata.total_records, 3);
        assert_eq!(loaded.metadata.source_file.as_deref(), Some("log.json"));
        assert_eq!(loaded.records(), result.records);
        assert_eq!(loaded.statistics.record_count, 3);
        assert_eq!(loaded.diagnostics.anomalies.len(), 1);
    }

    #[test]
    fn test_json_activity_shape() {
        let result = sample_result();
        let doc = ExportDocument::from_result(&result, None);
        let value = serde_json::to_value(&doc).unwrap();
        let first = &value["activities"][0];
        assert_eq!(first["course_name"], "4th Grade Math");
        assert_eq!(first["task_type"], "Quiz");
        assert_eq!(first["date"], "2025-01-15");
        assert!(first["completion_ratio"].as_f64().is_some());
    }

    #[test]
    fn test_read_json_export_missing_file() {
        let err = read_json_export(Path::new("/tmp/xp-analyzer-no-such-export.json")).unwrap_err();
        assert!(matches!(err, AnalyzerError::FileRead { .. }));
    }

    // ── CSV ───────────────────────────────────────────────────────────────────

    #[test]
    fn test_csv_columns_and_flags() {
        let result = sample_result();
        let bytes = records_to_csv(&result.records).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "date,course_name,task_type,xp_earned,xp_possible,completion_ratio,anomaly_flags"
        );
        let body: Vec<&str> = lines.collect();
        assert_eq!(body.len(), 3);
        assert!(body.iter().any(|l| l.ends_with("xp_exceeds_possible")));
        assert!(body
            .iter()
            .any(|l| l.starts_with("2025-01-16,Spanish,Unknown,10.0,,,")));
    }

    #[test]
    fn test_csv_empty_has_header() {
        let text = String::from_utf8(records_to_csv(&[]).unwrap()).unwrap();
        assert!(text.starts_with("date,course_name,"));
    }

    #[test]
    fn test_write_csv_export() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log_xp_export.csv");
        write_csv_export(&sample_result().records, &path).unwrap();
        let mut reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(reader.records().count(), 3);
    }

    // ── text summary ──────────────────────────────────────────────────────────

    #[test]
    fn test_text_summary() {
        let result = sample_result();
        let text = build_text_summary(&result.summary, &result.report);
        assert!(text.contains("Total records: 3"));
        assert!(text.contains("Total XP earned: 53 XP"));
        assert!(text.contains("Date range: 2025-01-15 to 2025-01-16"));
        assert!(text.contains("1 anomalies"));
    }

    #[test]
    fn test_text_summary_empty() {
        let text = build_text_summary(&SummaryStatistics::default(), &DiagnosticReport::default());
        assert!(text.contains("No activity found."));
    }
}
