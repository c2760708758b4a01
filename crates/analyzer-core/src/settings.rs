use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Output directory used when neither the CLI nor the last run named one.
pub const DEFAULT_OUT_DIR: &str = "xp_output";

// ── Settings (CLI) ────────────────────────────────────────────────────────────

/// Extract course progress records and XP statistics from activity logs
#[derive(Parser, Debug, Clone)]
#[command(
    name = "xp-analyzer",
    about = "Extract course progress records and XP statistics from activity logs",
    version
)]
pub struct Settings {
    #[command(subcommand)]
    pub command: Command,

    /// Logging level
    #[arg(long, global = true, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Display theme
    #[arg(long, global = true, default_value = "auto", value_parser = ["light", "dark", "auto"])]
    pub theme: String,

    /// Extraction config file (JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Only read the first N pages of each document
    #[arg(long, global = true)]
    pub max_pages: Option<usize>,

    /// Directory for exported files
    #[arg(long, global = true)]
    pub out_dir: Option<PathBuf>,

    /// Clear saved configuration
    #[arg(long, global = true)]
    pub clear: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Print the raw text of a document
    Text {
        input: PathBuf,
        /// Only this page (1-based)
        #[arg(long)]
        page: Option<usize>,
    },
    /// Print the table rows of a document
    Tables {
        input: PathBuf,
        /// Only this page (1-based)
        #[arg(long)]
        page: Option<usize>,
    },
    /// Show document metadata and page count
    Info { input: PathBuf },
    /// Search the document text for a term
    Search { input: PathBuf, term: String },
    /// Extract records and write JSON/CSV exports
    Export {
        input: PathBuf,
        #[arg(long, value_enum, default_value_t = ExportFormat::All)]
        format: ExportFormat,
        /// Exit with an error when no activity is found
        #[arg(long)]
        fail_on_empty: bool,
    },
    /// Print summary statistics for a document or a JSON export
    Stats { input: PathBuf },
    /// Open the interactive summary view
    View { input: PathBuf },
    /// Export every document found under a directory
    Batch {
        dir: PathBuf,
        #[arg(long, value_enum, default_value_t = ExportFormat::All)]
        format: ExportFormat,
        /// Documents processed in parallel
        #[arg(long, default_value = "4", value_parser = clap::value_parser!(u16).range(1..=64))]
        concurrency: u16,
    },
}

/// Export targets for the `export` and `batch` commands.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    All,
}

impl ExportFormat {
    pub fn wants_json(self) -> bool {
        matches!(self, ExportFormat::Json | ExportFormat::All)
    }

    pub fn wants_csv(self) -> bool {
        matches!(self, ExportFormat::Csv | ExportFormat::All)
    }
}

// ── LastUsedParams ────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.xp-analyzer/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl LastUsedParams {
    /// Default location, `~/.xp-analyzer/last_used.json`.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    pub fn config_path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(".xp-analyzer").join("last_used.json")
    }

    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    pub fn clear_at(path: &Path) -> Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ─────────────────────────────────────────────────────────────

impl Settings {
    /// Parse process arguments, merge with last-used params and persist.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Accepts args and an explicit config path so tests can redirect to a
    /// temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            if let Err(e) = LastUsedParams::clear_at(config_path) {
                tracing::warn!(error = %e, "could not clear saved configuration");
            }
            return settings.apply_debug();
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins over persisted values.
        if !is_arg_explicitly_set(&matches, "theme") {
            if let Some(v) = last.theme {
                settings.theme = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "log_level") {
            if let Some(v) = last.log_level {
                settings.log_level = v;
            }
        }
        if settings.out_dir.is_none() {
            settings.out_dir = last.out_dir;
        }

        let params = LastUsedParams::from(&settings);
        if let Err(e) = params.save_to(config_path) {
            tracing::warn!(error = %e, "could not persist last-used parameters");
        }

        settings.apply_debug()
    }

    /// `--debug` overrides the log level without being persisted.
    fn apply_debug(mut self) -> Self {
        if self.debug {
            self.log_level = "DEBUG".to_string();
        }
        self
    }

    pub fn out_dir(&self) -> PathBuf {
        self.out_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT_DIR))
    }
}

// ── Conversion ────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            theme: Some(s.theme.clone()),
            out_dir: s.out_dir.clone(),
            log_level: Some(s.log_level.clone()),
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line.
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tmp_config_path(tmp: &TempDir) -> PathBuf {
        LastUsedParams::config_path_in(tmp.path())
    }

    fn args(list: &[&str]) -> Vec<std::ffi::OsString> {
        list.iter().map(|s| s.into()).collect()
    }

    // ── LastUsedParams ────────────────────────────────────────────────────────

    #[test]
    fn test_last_used_params_save_load() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);
        let params = LastUsedParams {
            theme: Some("dark".to_string()),
            out_dir: Some(PathBuf::from("/tmp/exports")),
            log_level: Some("DEBUG".to_string()),
        };
        params.save_to(&path).expect("save");

        let loaded = LastUsedParams::load_from(&path);
        assert_eq!(loaded.theme.as_deref(), Some("dark"));
        assert_eq!(loaded.out_dir, Some(PathBuf::from("/tmp/exports")));
        assert_eq!(loaded.log_level.as_deref(), Some("DEBUG"));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_last_used_params_clear() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);
        LastUsedParams::default().save_to(&path).expect("save");
        assert!(path.exists());

        LastUsedParams::clear_at(&path).expect("clear");
        assert!(!path.exists());
        // Clearing twice is fine.
        LastUsedParams::clear_at(&path).expect("clear again");
    }

    #[test]
    fn test_last_used_params_default_when_corrupt() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();

        let loaded = LastUsedParams::load_from(&path);
        assert!(loaded.theme.is_none());
        assert!(loaded.out_dir.is_none());
    }

    // ── CLI parsing ───────────────────────────────────────────────────────────

    #[test]
    fn test_settings_default_values() {
        let settings = Settings::parse_from(["xp-analyzer", "info", "log.json"]);
        assert_eq!(
            settings.command,
            Command::Info {
                input: PathBuf::from("log.json")
            }
        );
        assert_eq!(settings.log_level, "INFO");
        assert_eq!(settings.theme, "auto");
        assert!(settings.config.is_none());
        assert!(settings.max_pages.is_none());
        assert_eq!(settings.out_dir(), PathBuf::from(DEFAULT_OUT_DIR));
        assert!(!settings.clear);
    }

    #[test]
    fn test_settings_export_subcommand() {
        let settings = Settings::parse_from([
            "xp-analyzer",
            "export",
            "log.json",
            "--format",
            "csv",
            "--fail-on-empty",
        ]);
        match settings.command {
            Command::Export {
                format,
                fail_on_empty,
                ..
            } => {
                assert_eq!(format, ExportFormat::Csv);
                assert!(fail_on_empty);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_settings_batch_concurrency() {
        let settings = Settings::parse_from(["xp-analyzer", "batch", "logs/", "--concurrency", "8"]);
        match settings.command {
            Command::Batch {
                concurrency,
                format,
                ..
            } => {
                assert_eq!(concurrency, 8);
                assert_eq!(format, ExportFormat::All);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_settings_batch_concurrency_out_of_range() {
        let result =
            Settings::try_parse_from(["xp-analyzer", "batch", "logs/", "--concurrency", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_settings_global_flags_after_subcommand() {
        let settings = Settings::parse_from([
            "xp-analyzer",
            "stats",
            "log.json",
            "--max-pages",
            "3",
            "--log-file",
            "/tmp/xp.log",
        ]);
        assert_eq!(settings.max_pages, Some(3));
        assert_eq!(settings.log_file, Some(PathBuf::from("/tmp/xp.log")));
    }

    #[test]
    fn test_export_format_targets() {
        assert!(ExportFormat::All.wants_json() && ExportFormat::All.wants_csv());
        assert!(ExportFormat::Json.wants_json() && !ExportFormat::Json.wants_csv());
        assert!(!ExportFormat::Csv.wants_json() && ExportFormat::Csv.wants_csv());
    }

    // ── load_with_last_used ───────────────────────────────────────────────────

    #[test]
    fn test_load_with_last_used_merges_persisted_values() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        LastUsedParams {
            theme: Some("dark".to_string()),
            out_dir: Some(PathBuf::from("/srv/xp")),
            log_level: Some("WARNING".to_string()),
        }
        .save_to(&config_path)
        .expect("save");

        let settings = Settings::load_with_last_used_impl(
            args(&["xp-analyzer", "info", "log.json"]),
            &config_path,
        );
        assert_eq!(settings.theme, "dark");
        assert_eq!(settings.log_level, "WARNING");
        assert_eq!(settings.out_dir(), PathBuf::from("/srv/xp"));
    }

    #[test]
    fn test_load_with_last_used_cli_overrides_persisted() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        LastUsedParams {
            theme: Some("dark".to_string()),
            ..Default::default()
        }
        .save_to(&config_path)
        .expect("save");

        let settings = Settings::load_with_last_used_impl(
            args(&["xp-analyzer", "--theme", "light", "info", "log.json"]),
            &config_path,
        );
        assert_eq!(settings.theme, "light");
        assert_eq!(
            LastUsedParams::load_from(&config_path).theme.as_deref(),
            Some("light")
        );
    }

    #[test]
    fn test_load_with_last_used_clear_removes_file() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        LastUsedParams {
            theme: Some("dark".to_string()),
            ..Default::default()
        }
        .save_to(&config_path)
        .expect("save");

        let settings = Settings::load_with_last_used_impl(
            args(&["xp-analyzer", "--clear", "info", "log.json"]),
            &config_path,
        );
        assert!(!config_path.exists());
        assert_eq!(settings.theme, "auto");
    }

    #[test]
    fn test_load_with_last_used_debug_not_persisted() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);

        let settings = Settings::load_with_last_used_impl(
            args(&["xp-analyzer", "--debug", "info", "log.json"]),
            &config_path,
        );
        assert_eq!(settings.log_level, "DEBUG");
        assert_eq!(
            LastUsedParams::load_from(&config_path).log_level.as_deref(),
            Some("INFO")
        );
    }
}
