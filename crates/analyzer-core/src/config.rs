use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{AnalyzerError, Result};
use crate::models::TaskType;
use crate::patterns::TaskKeywords;

/// Default upper bound on course-name length, in characters.
pub const DEFAULT_MAX_COURSE_NAME_LEN: usize = 120;

/// Tunables for the tokenizer and field extractor, loaded from `--config`.
///
/// ```json
/// {
///   "task_aliases": { "test": "Quiz", "practice": "Review" },
///   "skip_prefixes": ["Generated by"],
///   "max_course_name_len": 80
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Extra keyword → task type mappings on top of the built-in keywords.
    pub task_aliases: BTreeMap<String, TaskType>,
    /// Additional line prefixes treated as boilerplate.
    pub skip_prefixes: Vec<String>,
    pub max_course_name_len: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            task_aliases: BTreeMap::new(),
            skip_prefixes: Vec::new(),
            max_course_name_len: DEFAULT_MAX_COURSE_NAME_LEN,
        }
    }
}

impl ExtractionConfig {
    /// Read and validate a JSON config file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| AnalyzerError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: ExtractionConfig = serde_json::from_str(&content)?;
        config.validate()?;
        tracing::debug!(
            path = %path.display(),
            aliases = config.task_aliases.len(),
            "loaded extraction config"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_course_name_len == 0 {
            return Err(AnalyzerError::Config(
                "max_course_name_len must be positive".to_string(),
            ));
        }
        self.task_keywords().map(|_| ())
    }

    /// Keyword table for the built-in keywords plus `task_aliases`.
    pub fn task_keywords(&self) -> Result<TaskKeywords> {
        TaskKeywords::with_aliases(&self.task_aliases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = ExtractionConfig::default();
        assert_eq!(config.max_course_name_len, 120);
        assert!(config.task_aliases.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_config_fills_defaults() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("extract.json");
        std::fs::write(&path, r#"{"task_aliases": {"test": "Quiz"}}"#).expect("write");

        let config = ExtractionConfig::load_from(&path).expect("load");
        assert_eq!(config.task_aliases.get("test"), Some(&TaskType::Quiz));
        assert_eq!(config.max_course_name_len, DEFAULT_MAX_COURSE_NAME_LEN);
        assert!(config.skip_prefixes.is_empty());
    }

    #[test]
    fn test_load_rejects_zero_length() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("extract.json");
        std::fs::write(&path, r#"{"max_course_name_len": 0}"#).expect("write");

        let err = ExtractionConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, AnalyzerError::Config(_)));
    }

    #[test]
    fn test_load_rejects_unknown_task_type() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("extract.json");
        std::fs::write(&path, r#"{"task_aliases": {"exam": "Exam"}}"#).expect("write");

        let err = ExtractionConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, AnalyzerError::JsonParse(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let tmp = TempDir::new().expect("tempdir");
        let err = ExtractionConfig::load_from(&tmp.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, AnalyzerError::FileRead { .. }));
    }

    #[test]
    fn test_task_keywords_include_aliases() {
        let mut config = ExtractionConfig::default();
        config
            .task_aliases
            .insert("practice".to_string(), TaskType::Review);
        let keywords = config.task_keywords().expect("keywords");
        assert_eq!(
            keywords.find("Spelling Practice 5 XP").map(|m| m.task_type),
            Some(TaskType::Review)
        );
    }
}
