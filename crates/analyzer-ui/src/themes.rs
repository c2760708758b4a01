use ratatui::style::{Color, Modifier, Style};

/// Terminal background type detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackgroundType {
    Dark,
    Light,
}

/// Detect terminal background type from the `COLORFGBG` environment variable.
///
/// The variable has the format `"foreground;background"`. Background values
/// 0–6 are dark and 7–15 light. Anything else falls back to dark.
pub fn detect_background() -> BackgroundType {
    std::env::var("COLORFGBG")
        .ok()
        .and_then(|val| background_from_colorfgbg(&val))
        .unwrap_or(BackgroundType::Dark)
}

fn background_from_colorfgbg(value: &str) -> Option<BackgroundType> {
    let bg = value.split(';').next_back()?.trim().parse::<u8>().ok()?;
    Some(if bg <= 6 {
        BackgroundType::Dark
    } else {
        BackgroundType::Light
    })
}

/// Styles used by the summary screen.
#[derive(Debug, Clone)]
pub struct Theme {
    // ── Header ───────────────────────────────────────────────────────────────
    pub header: Style,
    pub header_accent: Style,
    pub separator: Style,

    // ── Text ─────────────────────────────────────────────────────────────────
    pub text: Style,
    pub dim: Style,
    pub label: Style,
    pub value: Style,

    // ── Status ───────────────────────────────────────────────────────────────
    pub success: Style,
    pub warning: Style,
    pub error: Style,

    // ── Completion ratio ─────────────────────────────────────────────────────
    /// Ratio below 60 %.
    pub ratio_low: Style,
    pub ratio_medium: Style,
    /// Ratio at or above 85 %.
    pub ratio_high: Style,

    // ── Table ────────────────────────────────────────────────────────────────
    pub table_header: Style,
    pub table_border: Style,
    pub table_row: Style,
    pub table_row_alt: Style,
    pub table_total: Style,

    // ── Chart ────────────────────────────────────────────────────────────────
    pub chart_bar: Style,
    pub chart_value: Style,
    pub chart_label: Style,
}

impl Theme {
    /// Dark-background terminal theme (default).
    pub fn dark() -> Self {
        Self {
            header: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            header_accent: Style::default().fg(Color::Yellow),
            separator: Style::default().fg(Color::DarkGray),

            text: Style::default().fg(Color::White),
            dim: Style::default().fg(Color::DarkGray),
            label: Style::default().fg(Color::Gray),
            value: Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),

            success: Style::default().fg(Color::Green),
            warning: Style::default().fg(Color::Yellow),
            error: Style::default().fg(Color::Red),

            ratio_low: Style::default().fg(Color::Red),
            ratio_medium: Style::default().fg(Color::Yellow),
            ratio_high: Style::default().fg(Color::Green),

            table_header: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            table_border: Style::default().fg(Color::DarkGray),
            table_row: Style::default().fg(Color::White),
            table_row_alt: Style::default().fg(Color::Gray),
            table_total: Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),

            chart_bar: Style::default().fg(Color::Cyan),
            chart_value: Style::default().fg(Color::Black).bg(Color::Cyan),
            chart_label: Style::default().fg(Color::Gray),
        }
    }

    /// Light-background terminal theme.
    pub fn light() -> Self {
        Self {
            header: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            header_accent: Style::default().fg(Color::Magenta),
            separator: Style::default().fg(Color::Gray),

            text: Style::default().fg(Color::Black),
            dim: Style::default().fg(Color::Gray),
            label: Style::default().fg(Color::DarkGray),
            value: Style::default()
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),

            success: Style::default().fg(Color::Green),
            warning: Style::default().fg(Color::Yellow),
            error: Style::default().fg(Color::Red),

            ratio_low: Style::default().fg(Color::Red),
            ratio_medium: Style::default().fg(Color::Magenta),
            ratio_high: Style::default().fg(Color::Green),

            table_header: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            table_border: Style::default().fg(Color::Gray),
            table_row: Style::default().fg(Color::Black),
            table_row_alt: Style::default().fg(Color::DarkGray),
            table_total: Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),

            chart_bar: Style::default().fg(Color::Blue),
            chart_value: Style::default().fg(Color::White).bg(Color::Blue),
            chart_label: Style::default().fg(Color::DarkGray),
        }
    }

    /// Choose a theme from the detected terminal background.
    pub fn auto_detect() -> Self {
        match detect_background() {
            BackgroundType::Light => Self::light(),
            BackgroundType::Dark => Self::dark(),
        }
    }

    /// Construct a theme by name. `auto` and unknown names detect.
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "light" => Self::light(),
            "dark" => Self::dark(),
            _ => Self::auto_detect(),
        }
    }

    // ── Style helpers ────────────────────────────────────────────────────────

    /// Style for a completion ratio in `[0, 1]`; undefined ratios are dim.
    pub fn ratio_style(&self, ratio: Option<f64>) -> Style {
        match ratio {
            Some(r) if r >= 0.85 => self.ratio_high,
            Some(r) if r >= 0.60 => self.ratio_medium,
            Some(_) => self.ratio_low,
            None => self.dim,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── Theme construction ───────────────────────────────────────────────────

    #[test]
    fn test_dark_theme_creation() {
        let t = Theme::dark();
        assert_eq!(t.header.fg, Some(Color::Cyan));
        assert_eq!(t.text.fg, Some(Color::White));
        assert_eq!(t.chart_bar.fg, Some(Color::Cyan));
    }

    #[test]
    fn test_light_theme_creation() {
        let t = Theme::light();
        assert_eq!(t.header.fg, Some(Color::Blue));
        assert_eq!(t.text.fg, Some(Color::Black));
        assert_eq!(t.table_row.fg, Some(Color::Black));
    }

    #[test]
    fn test_from_name() {
        assert_eq!(Theme::from_name("dark").header.fg, Some(Color::Cyan));
        assert_eq!(Theme::from_name("LIGHT").header.fg, Some(Color::Blue));
    }

    #[test]
    fn test_from_name_auto_returns_valid_theme() {
        assert!(Theme::from_name("auto").header.fg.is_some());
        assert!(Theme::from_name("does-not-exist").header.fg.is_some());
    }

    // ── background detection ─────────────────────────────────────────────────

    #[test]
    fn test_colorfgbg_parsing() {
        assert_eq!(background_from_colorfgbg("15;0"), Some(BackgroundType::Dark));
        assert_eq!(background_from_colorfgbg("0;15"), Some(BackgroundType::Light));
        assert_eq!(background_from_colorfgbg("0;default;7"), Some(BackgroundType::Light));
        assert_eq!(background_from_colorfgbg("garbage"), None);
    }

    // ── ratio_style thresholds ───────────────────────────────────────────────

    #[test]
    fn test_ratio_style_thresholds() {
        let t = Theme::dark();
        assert_eq!(t.ratio_style(Some(0.2)).fg, Some(Color::Red));
        assert_eq!(t.ratio_style(Some(0.6)).fg, Some(Color::Yellow));
        assert_eq!(t.ratio_style(Some(0.85)).fg, Some(Color::Green));
        assert_eq!(t.ratio_style(Some(1.2)).fg, Some(Color::Green));
        assert_eq!(t.ratio_style(None).fg, Some(Color::DarkGray));
    }
}
