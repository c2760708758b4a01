//! Page-dump discovery and loading.
//!
//! Documents arrive already materialized: either a JSON page dump
//! (`{"metadata": {...}, "pages": [{"text_lines": [...], "table_rows": [...]}]}`)
//! or a plain-text dump whose pages are separated by form feeds. This module
//! turns them into [`Document`]s and offers the read-only queries the CLI
//! exposes (`text`, `tables`, `info`, `search`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use analyzer_core::error::{AnalyzerError, Result};
use analyzer_core::models::{Document, Page};
use regex::RegexBuilder;
use serde::Serialize;
use tracing::{debug, warn};

use crate::export::EXPORT_MARKER;

/// Characters of context kept on each side of a search hit.
pub const SEARCH_CONTEXT_CHARS: usize = 100;

/// Page separator in text dumps.
const FORM_FEED: char = '\u{0C}';

// ── Discovery ─────────────────────────────────────────────────────────────────

/// `true` for file names this reader can load (`.json`, `.txt`), excluding
/// JSON exports written by this tool.
pub fn is_document_path(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if name.contains(EXPORT_MARKER) {
        return false;
    }
    matches!(
        path.extension().and_then(|e| e.to_str()).map(|e| e.to_lowercase()).as_deref(),
        Some("json") | Some("txt")
    )
}

/// Find all loadable documents recursively under `dir`, sorted by path.
pub fn find_documents(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Err(AnalyzerError::InputNotFound(dir.to_path_buf()));
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_document_path(entry.path()))
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    debug!("Found {} documents under {}", files.len(), dir.display());
    Ok(files)
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Load a page dump from disk, choosing the format by file extension.
pub fn load_document(path: &Path) -> Result<Document> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    let content = match ext.as_deref() {
        Some("json") | Some("txt") => {
            std::fs::read_to_string(path).map_err(|source| AnalyzerError::FileRead {
                path: path.to_path_buf(),
                source,
            })?
        }
        _ => return Err(AnalyzerError::UnsupportedInput(path.to_path_buf())),
    };

    let label = path.display().to_string();
    let mut document = if ext.as_deref() == Some("json") {
        parse_json_dump(&content, &label)?
    } else {
        parse_text_dump(&content)
    };

    document
        .metadata
        .entry("source_file".to_string())
        .or_insert_with(|| serde_json::Value::String(label));

    debug!(
        "Loaded {} with {} pages",
        path.display(),
        document.page_count()
    );
    Ok(document)
}

/// Parse a JSON page dump; a payload without a `pages` field is rejected.
pub fn parse_json_dump(content: &str, label: &str) -> Result<Document> {
    let value: serde_json::Value = serde_json::from_str(content)?;
    if value.get("pages").is_none() {
        return Err(AnalyzerError::MissingPages(label.to_string()));
    }
    Ok(serde_json::from_value(value)?)
}

/// Split a text dump on form feeds; each chunk becomes a text-only page.
pub fn parse_text_dump(content: &str) -> Document {
    if content.trim().is_empty() {
        return Document::new(Vec::new());
    }
    let pages = content.split(FORM_FEED).map(Page::from_text).collect();
    Document::new(pages)
}

// ── Queries ───────────────────────────────────────────────────────────────────

/// All text lines of a page joined by newlines.
pub fn page_text(page: &Page) -> String {
    page.text_lines.join("\n")
}

/// Text of every page that has any, joined by newlines.
pub fn extract_text(document: &Document) -> String {
    document
        .pages
        .iter()
        .map(page_text)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Text per page, with an empty string for pages without text.
pub fn extract_text_by_page(document: &Document) -> Vec<String> {
    document.pages.iter().map(page_text).collect()
}

/// All table rows of the document in page order.
pub fn extract_tables(document: &Document) -> Vec<Vec<String>> {
    document
        .pages
        .iter()
        .flat_map(|p| p.table_rows.iter().cloned())
        .collect()
}

/// Table rows keyed by 1-based page number; pages without rows are omitted.
pub fn extract_tables_by_page(document: &Document) -> BTreeMap<usize, Vec<Vec<String>>> {
    document
        .pages
        .iter()
        .enumerate()
        .filter(|(_, p)| !p.table_rows.is_empty())
        .map(|(i, p)| (i + 1, p.table_rows.clone()))
        .collect()
}

pub fn metadata(document: &Document) -> &BTreeMap<String, serde_json::Value> {
    &document.metadata
}

pub fn page_count(document: &Document) -> usize {
    document.page_count()
}

/// One page on which a search term occurs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    /// 1-based page number.
    pub page: usize,
    /// Text around the first occurrence, elided with `...` on both sides.
    pub context: String,
}

/// Case-insensitive search of each page's text.
pub fn search_text(document: &Document, term: &str) -> Vec<SearchHit> {
    if term.is_empty() {
        return Vec::new();
    }
    let Ok(re) = RegexBuilder::new(&regex::escape(term))
        .case_insensitive(true)
        .build()
    else {
        return Vec::new();
    };

    document
        .pages
        .iter()
        .enumerate()
        .filter_map(|(i, page)| {
            let text = page_text(page);
            let m = re.find(&text)?;
            Some(SearchHit {
                page: i + 1,
                context: context_around(&text, m.start(), m.end(), SEARCH_CONTEXT_CHARS),
            })
        })
        .collect()
}

/// Slice `text` to `chars` characters either side of `start..end`.
fn context_around(text: &str, start: usize, end: usize, chars: usize) -> String {
    let from = text[..start]
        .char_indices()
        .rev()
        .nth(chars.saturating_sub(1))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let to = text[end..]
        .char_indices()
        .nth(chars)
        .map(|(i, _)| end + i)
        .unwrap_or(text.len());
    format!("...{}...", &text[from..to])
}

// ── Tests ─────────────────────────────────────────────────────────────────────
