mod bootstrap;
mod commands;

use analyzer_core::settings::Settings;
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_deref())?;

    tracing::info!("XP Analyzer v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::debug!(
        theme = %settings.theme,
        out_dir = %settings.out_dir().display(),
        max_pages = ?settings.max_pages,
        "settings loaded"
    );

    commands::run(&settings).await
}
