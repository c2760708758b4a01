//! Terminal UI layer for the XP analyzer.
//!
//! Provides themes, the per-course table, the daily XP chart and the
//! summary screen event loop built on top of [`ratatui`].

use unicode_width::UnicodeWidthChar;

pub mod app;
pub mod summary_view;
pub mod table_view;
pub mod themes;

pub use analyzer_core as core;

/// Cut `text` to at most `max_width` terminal columns, ending in `…` when
/// anything was dropped.
pub fn truncate_to_width(text: &str, max_width: usize) -> String {
    if unicode_width::UnicodeWidthStr::width(text) <= max_width {
        return text.to_string();
    }
    if max_width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > max_width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_text_unchanged() {
        assert_eq!(truncate_to_width("Algebra", 10), "Algebra");
    }

    #[test]
    fn test_truncate_ascii() {
        assert_eq!(truncate_to_width("4th Grade Math", 8), "4th Gra…");
    }

    #[test]
    fn test_truncate_wide_chars() {
        // Each CJK character is two columns wide.
        let out = truncate_to_width("数学数学数学", 7);
        assert_eq!(out, "数学数…");
        assert!(unicode_width::UnicodeWidthStr::width(out.as_str()) <= 7);
    }

    #[test]
    fn test_truncate_zero_width() {
        assert_eq!(truncate_to_width("Algebra", 0), "");
    }
}
