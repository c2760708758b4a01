//! Subcommand implementations.

use std::path::{Path, PathBuf};

use analyzer_core::config::ExtractionConfig;
use analyzer_core::models::{DiagnosticReport, Document};
use analyzer_core::settings::{Command, ExportFormat, Settings};
use analyzer_data::aggregator::SummaryStatistics;
use analyzer_data::analysis::{analyze_document, AnalysisOptions, AnalysisResult};
use analyzer_data::export::{
    build_text_summary, export_path, read_json_export, write_csv_export, write_json_export,
    ExportDocument, EXPORT_MARKER,
};
use analyzer_data::reader;
use analyzer_runtime::batch::{collect_ordered, BatchOrchestrator};
use analyzer_ui::app::App;
use analyzer_ui::summary_view::SummaryViewData;
use anyhow::{bail, Context, Result};

/// Dispatch the parsed subcommand.
pub async fn run(settings: &Settings) -> Result<()> {
    match &settings.command {
        Command::Text { input, page } => print_text(&load(settings, input)?, *page),
        Command::Tables { input, page } => print_tables(&load(settings, input)?, *page),
        Command::Info { input } => print_info(&load(settings, input)?),
        Command::Search { input, term } => print_search(&load(settings, input)?, term),
        Command::Export {
            input,
            format,
            fail_on_empty,
        } => {
            let options = analysis_options(settings)?;
            let (result, written) =
                export_document(input, &settings.out_dir(), *format, &options)?;
            for path in &written {
                println!("Saved: {}", path.display());
            }
            print!("{}", build_text_summary(&result.summary, &result.report));
            if *fail_on_empty && result.is_empty() {
                bail!("no activity found in {}", input.display());
            }
            Ok(())
        }
        Command::Stats { input } => {
            let (summary, report) = load_summary(input, &analysis_options(settings)?)?;
            print!("{}", build_text_summary(&summary, &report));
            Ok(())
        }
        Command::View { input } => {
            let (summary, report) = load_summary(input, &analysis_options(settings)?)?;
            let data = SummaryViewData {
                source: display_name(input),
                summary,
                diagnostics: report.len(),
            };
            let app = App::new(&settings.theme, data);
            tokio::task::spawn_blocking(move || app.run())
                .await
                .context("summary view task failed")??;
            Ok(())
        }
        Command::Batch {
            dir,
            format,
            concurrency,
        } => {
            run_batch(
                dir,
                &settings.out_dir(),
                *format,
                usize::from(*concurrency),
                analysis_options(settings)?,
            )
            .await
        }
    }
}

// ── Shared helpers ────────────────────────────────────────────────────────────

fn analysis_options(settings: &Settings) -> Result<AnalysisOptions> {
    let extraction = match &settings.config {
        Some(path) => ExtractionConfig::load_from(path)
            .with_context(|| format!("invalid extraction config {}", path.display()))?,
        None => ExtractionConfig::default(),
    };
    Ok(AnalysisOptions {
        extraction,
        max_pages: settings.max_pages,
    })
}

/// Load a document, honouring `--max-pages`.
fn load(settings: &Settings, input: &Path) -> Result<Document> {
    let mut document = reader::load_document(input)?;
    if let Some(limit) = settings.max_pages {
        document.pages.truncate(limit);
    }
    Ok(document)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn is_export_file(path: &Path) -> bool {
    display_name(path).contains(EXPORT_MARKER)
}

/// Pages selected by a 1-based `--page` argument.
fn select_pages(count: usize, page: Option<usize>) -> Result<Vec<usize>> {
    match page {
        None => Ok((1..=count).collect()),
        Some(p) if p >= 1 && p <= count => Ok(vec![p]),
        Some(p) => bail!("page {p} out of range (document has {count} pages)"),
    }
}

// ── Reader commands ───────────────────────────────────────────────────────────

fn print_text(document: &Document, page: Option<usize>) -> Result<()> {
    let texts = reader::extract_text_by_page(document);
    for p in select_pages(texts.len(), page)? {
        println!("--- Page {p} ---");
        println!("{}", texts[p - 1]);
    }
    Ok(())
}

fn print_tables(document: &Document, page: Option<usize>) -> Result<()> {
    let by_page = reader::extract_tables_by_page(document);
    let wanted = select_pages(reader::page_count(document), page)?;
    let mut printed = 0usize;
    for (p, rows) in by_page.iter().filter(|(p, _)| wanted.contains(*p)) {
        println!("--- Page {p} ({} rows) ---", rows.len());
        for row in rows {
            println!("{}", row.join(" | "));
        }
        printed += rows.len();
    }
    if printed == 0 {
        println!("No tables found.");
    }
    Ok(())
}

fn print_info(document: &Document) -> Result<()> {
    println!("Pages: {}", reader::page_count(document));
    for (key, value) in reader::metadata(document) {
        match value.as_str() {
            Some(s) => println!("{key}: {s}"),
            None => println!("{key}: {value}"),
        }
    }
    Ok(())
}

fn print_search(document: &Document, term: &str) -> Result<()> {
    let hits = reader::search_text(document, term);
    if hits.is_empty() {
        println!("No matches for '{term}'.");
        return Ok(());
    }
    println!("{} matches for '{term}':", hits.len());
    for hit in hits {
        println!("[page {}] {}", hit.page, hit.context);
    }
    Ok(())
}

// ── Analysis commands ─────────────────────────────────────────────────────────

/// Analyse `input` and write the requested exports into `out_dir`.
pub fn export_document(
    input: &Path,
    out_dir: &Path,
    format: ExportFormat,
    options: &AnalysisOptions,
) -> Result<(AnalysisResult, Vec<PathBuf>)> {
    let document = reader::load_document(input)?;
    let result = analyze_document(&document, options)?;
    let written = write_exports(&result, input, out_dir, format)?;
    Ok((result, written))
}

fn write_exports(
    result: &AnalysisResult,
    input: &Path,
    out_dir: &Path,
    format: ExportFormat,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    if format.wants_json() {
        let path = export_path(input, out_dir, "json");
        write_json_export(&ExportDocument::from_result(result, Some(input)), &path)?;
        written.push(path);
    }
    if format.wants_csv() {
        let path = export_path(input, out_dir, "csv");
        write_csv_export(&result.records, &path)?;
        written.push(path);
    }
    Ok(written)
}

/// Summary of a document, or of a previously written JSON export.
pub fn load_summary(
    input: &Path,
    options: &AnalysisOptions,
) -> Result<(SummaryStatistics, DiagnosticReport)> {
    if is_export_file(input) {
        let export = read_json_export(input)?;
        return Ok((export.statistics, export.diagnostics));
    }
    let document = reader::load_document(input)?;
    let result = analyze_document(&document, options)?;
    Ok((result.summary, result.report))
}

async fn run_batch(
    dir: &Path,
    out_dir: &Path,
    format: ExportFormat,
    concurrency: usize,
    options: AnalysisOptions,
) -> Result<()> {
    let documents = reader::find_documents(dir)?;
    if documents.is_empty() {
        println!("No documents found under {}", dir.display());
        return Ok(());
    }
    tracing::info!(documents = documents.len(), concurrency, "starting batch");

    let (rx, handle) = BatchOrchestrator::new(documents, options, concurrency).start();

    let outcomes = tokio::select! {
        outcomes = collect_ordered(rx) => outcomes,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Ctrl+C received; stopping batch");
            handle.abort();
            bail!("batch interrupted");
        }
    };

    let mut failed = 0usize;
    let mut total_records = 0usize;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(result) => {
                write_exports(result, &outcome.path, out_dir, format)?;
                total_records += result.records.len();
                println!(
                    "{}: {} records, {} diagnostics",
                    outcome.path.display(),
                    result.records.len(),
                    result.report.len()
                );
            }
            Err(e) => {
                failed += 1;
                println!("{}: failed: {e}", outcome.path.display());
            }
        }
    }
    println!(
        "Processed {} documents, {} records total.",
        outcomes.len(),
        total_records
    );

    if failed > 0 {
        bail!("{failed} of {} documents failed", outcomes.len());
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
