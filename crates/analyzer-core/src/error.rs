use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the analyzer crates.
///
/// Data-quality problems inside a document (malformed units, missing fields,
/// XP inconsistencies) are never errors; they are reported as diagnostics on
/// the analysis result. Only contract violations and I/O failures end up here.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// Opening or reading an input or export file failed.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A page dump or export was not valid JSON.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A CSV file could not be written.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A page dump did not carry a `pages` field at all.
    #[error("Document has no pages field: {0}")]
    MissingPages(String),

    /// The input file extension is not a known page-dump format.
    #[error("Unsupported input file: {0}")]
    UnsupportedInput(PathBuf),

    /// The given directory does not exist.
    #[error("Input path not found: {0}")]
    InputNotFound(PathBuf),

    /// An extraction setting is out of range.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O failure with no file path attached (writes, renames).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Anything else, e.g. a panicked worker task in a batch run.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the analyzer crates.
pub type Result<T> = std::result::Result<T, AnalyzerError>;
