//! Extraction layer for the XP analyzer.
//!
//! Loads page dumps of activity logs, groups their content into raw units,
//! extracts and validates course progress records, aggregates summary
//! statistics and writes the results out as JSON or CSV.

pub mod aggregator;
pub mod analysis;
pub mod export;
pub mod extractor;
pub mod reader;
pub mod tokenizer;
pub mod validator;

pub use analyzer_core as core;
