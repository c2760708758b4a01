//! Application state and event loop for the read-only summary screen.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Frame, Terminal};

use crate::summary_view::{self, SummaryViewData};
use crate::themes::Theme;

/// Root application state.
pub struct App {
    pub theme: Theme,
    pub data: SummaryViewData,
    /// Set to `true` to break out of the event loop on the next iteration.
    pub should_quit: bool,
}

impl App {
    pub fn new(theme_name: &str, data: SummaryViewData) -> Self {
        Self {
            theme: Theme::from_name(theme_name),
            data,
            should_quit: false,
        }
    }

    /// Show the summary until `q`, `Esc` or `Ctrl+C` is pressed.
    ///
    /// Polls for key events with a 250 ms timeout so resizes redraw promptly.
    pub fn run(mut self) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let tick_rate = Duration::from_millis(250);

        let result = loop {
            if let Err(e) = terminal.draw(|frame| self.render(frame)) {
                break Err(e);
            }
            match event::poll(tick_rate) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) => self.handle_key(key),
                    Ok(_) => {}
                    Err(e) => break Err(e),
                },
                Ok(false) => {}
                Err(e) => break Err(e),
            }
            if self.should_quit {
                break Ok(());
            }
        };

        // Restore terminal state unconditionally.
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind == KeyEventKind::Release {
            return;
        }
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => self.should_quit = true,
            _ => {}
        }
    }

    pub fn render(&self, frame: &mut Frame) {
        summary_view::render_summary(frame, &self.data, &self.theme);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use analyzer_data::aggregator::SummaryStatistics;
    use ratatui::backend::TestBackend;
    use ratatui::style::Color;

    fn app(theme: &str) -> App {
        App::new(
            theme,
            SummaryViewData {
                source: "log.json".to_string(),
                summary: SummaryStatistics::default(),
                diagnostics: 0,
            },
        )
    }

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    // ── creation ──────────────────────────────────────────────────────────

    #[test]
    fn test_app_creation_defaults() {
        let a = app("dark");
        assert!(!a.should_quit);
        assert_eq!(a.theme.header.fg, Some(Color::Cyan));
    }

    #[test]
    fn test_app_creation_light_theme() {
        assert_eq!(app("light").theme.header.fg, Some(Color::Blue));
    }

    // ── keys ──────────────────────────────────────────────────────────────

    #[test]
    fn test_quit_keys() {
        for key in [
            press(KeyCode::Char('q'), KeyModifiers::NONE),
            press(KeyCode::Char('Q'), KeyModifiers::SHIFT),
            press(KeyCode::Esc, KeyModifiers::NONE),
            press(KeyCode::Char('c'), KeyModifiers::CONTROL),
        ] {
            let mut a = app("dark");
            a.handle_key(key);
            assert!(a.should_quit, "{key:?} should quit");
        }
    }

    #[test]
    fn test_other_keys_ignored() {
        let mut a = app("dark");
        a.handle_key(press(KeyCode::Char('c'), KeyModifiers::NONE));
        a.handle_key(press(KeyCode::Down, KeyModifiers::NONE));
        assert!(!a.should_quit);
    }

    // ── render ────────────────────────────────────────────────────────────

    #[test]
    fn test_render_does_not_panic() {
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        let a = app("dark");
        terminal.draw(|frame| a.render(frame)).unwrap();
    }
}
