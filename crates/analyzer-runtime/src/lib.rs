//! Runtime orchestration layer for the XP analyzer.
//!
//! Runs the extraction pipeline over many documents in parallel for the
//! `batch` command.

pub mod batch;

pub use analyzer_core as core;
pub use analyzer_data as data;
