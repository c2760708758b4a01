//! Main extraction pipeline.
//!
//! Tokenizes a document into raw units, extracts fields from each unit,
//! validates the resulting drafts and summarizes the accepted records,
//! returning an [`AnalysisResult`] ready for export or display.

use std::collections::BTreeMap;
use std::path::Path;

use analyzer_core::config::ExtractionConfig;
use analyzer_core::error::Result;
use analyzer_core::models::{CourseProgressRecord, DiagnosticReport, Document, Page};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::aggregator::{Aggregator, SummaryStatistics};
use crate::extractor::{Extraction, ExtractionContext, FieldExtractor};
use crate::reader::load_document;
use crate::tokenizer::EntryTokenizer;
use crate::validator::RecordValidator;

// ── Public types ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    pub extraction: ExtractionConfig,
    /// Only the first `max_pages` pages are read when set.
    pub max_pages: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    #[default]
    Ok,
    /// The document had no pages or yielded no accepted records.
    NoActivityFound,
}

/// Metadata produced alongside the analysis result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    /// ISO-8601 timestamp when this result was generated.
    pub generated_at: String,
    pub pages_processed: usize,
    pub units_tokenized: usize,
    pub records_accepted: usize,
    pub units_malformed: usize,
    /// Wall-clock seconds spent tokenizing and extracting.
    pub extract_time_seconds: f64,
    /// Wall-clock seconds spent summarizing.
    pub aggregate_time_seconds: f64,
}

/// The complete output of [`analyze_pages`].
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub records: Vec<CourseProgressRecord>,
    pub summary: SummaryStatistics,
    pub report: DiagnosticReport,
    pub status: AnalysisStatus,
    pub metadata: AnalysisMetadata,
    /// Document metadata passed through from the reader.
    pub document_metadata: BTreeMap<String, serde_json::Value>,
}

impl AnalysisResult {
    pub fn is_empty(&self) -> bool {
        self.status == AnalysisStatus::NoActivityFound
    }
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Run the pipeline over a loaded document.
pub fn analyze_document(document: &Document, options: &AnalysisOptions) -> Result<AnalysisResult> {
    let mut result = analyze_pages(&document.pages, options)?;
    result.document_metadata = document.metadata.clone();
    Ok(result)
}

/// Load `path` with the document reader and run the pipeline over it.
pub fn analyze_file(path: &Path, options: &AnalysisOptions) -> Result<AnalysisResult> {
    let document = load_document(path)?;
    analyze_document(&document, options)
}

/// Run the pipeline over an ordered page sequence.
///
/// 1. Group page content into raw units.
/// 2. Extract fields from each unit in document order.
/// 3. Validate drafts, recording discards and anomalies.
/// 4. Summarize the accepted records.
///
/// Fails only when the extraction configuration is invalid.
pub fn analyze_pages(pages: &[Page], options: &AnalysisOptions) -> Result<AnalysisResult> {
    let extractor = FieldExtractor::new(&options.extraction)?;
    let pages = match options.max_pages {
        Some(limit) if limit < pages.len() => &pages[..limit],
        _ => pages,
    };

    // ── Step 1: Tokenize ──────────────────────────────────────────────────────
    let extract_start = std::time::Instant::now();
    let tokenizer = EntryTokenizer::new(extractor.keywords(), &options.extraction);
    let units = tokenizer.tokenize(pages);
    debug!(pages = pages.len(), units = units.len(), "tokenized document");

    // ── Step 2 & 3: Extract and validate ──────────────────────────────────────
    let mut ctx = ExtractionContext::default();
    let mut validator = RecordValidator::new();
    let mut malformed = 0usize;
    for unit in &units {
        match extractor.extract(unit, &mut ctx) {
            Extraction::Draft(draft) => {
                validator.validate(draft);
            }
            Extraction::DateHeader { date, daily_total } => {
                if let Some(stated) = daily_total {
                    validator.note_daily_total(date, stated, unit.location);
                }
            }
            Extraction::Malformed => {
                malformed += 1;
                validator.note_malformed(unit);
            }
        }
    }
    let outcome = validator.finish();
    let extract_time = extract_start.elapsed().as_secs_f64();

    // ── Step 4: Summarize ─────────────────────────────────────────────────────
    let aggregate_start = std::time::Instant::now();
    let summary = Aggregator::summarize(&outcome.records);
    let aggregate_time = aggregate_start.elapsed().as_secs_f64();

    let status = if outcome.records.is_empty() {
        AnalysisStatus::NoActivityFound
    } else {
        AnalysisStatus::Ok
    };

    info!(
        records = outcome.records.len(),
        diagnostics = outcome.report.len(),
        ?status,
        "analysis complete"
    );

    let metadata = AnalysisMetadata {
        generated_at: Utc::now().to_rfc3339(),
        pages_processed: pages.len(),
        units_tokenized: units.len(),
        records_accepted: outcome.records.len(),
        units_malformed: malformed,
        extract_time_seconds: extract_time,
        aggregate_time_seconds: aggregate_time,
    };

    Ok(AnalysisResult {
        records: outcome.records,
        summary,
        report: outcome.report,
        status,
        metadata,
        document_metadata: BTreeMap::new(),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
