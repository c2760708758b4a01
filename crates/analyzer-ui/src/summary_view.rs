//! Summary screen: header with totals and streaks, daily XP bar chart and
//! the per-course table.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Paragraph},
    Frame,
};

use analyzer_core::formatting::{format_change, format_ratio, format_xp};
use analyzer_data::aggregator::{DailyPoint, SummaryStatistics, TrendStatus};

use crate::table_view::{self, course_rows, course_totals};
use crate::themes::Theme;
use crate::truncate_to_width;

/// Columns taken by one bar of the daily chart, gap included.
const BAR_WIDTH: u16 = 5;
const BAR_GAP: u16 = 1;

const HEADER_HEIGHT: u16 = 6;
const CHART_HEIGHT: u16 = 12;

/// Everything the summary screen displays.
#[derive(Debug, Clone)]
pub struct SummaryViewData {
    /// Source document name shown in the title.
    pub source: String,
    pub summary: SummaryStatistics,
    /// Discards plus anomalies.
    pub diagnostics: usize,
}

/// Header lines: title, separator, totals, streaks and trend.
pub fn header_lines<'a>(data: &'a SummaryViewData, theme: &Theme, width: usize) -> Vec<Line<'a>> {
    let s = &data.summary;
    let range = s
        .date_range
        .map(|r| format!("{} to {}", r.start, r.end))
        .unwrap_or_else(|| "no dates".to_string());
    let streak = s
        .longest_streak
        .map(|st| format!("{} days", st.length))
        .unwrap_or_else(|| "none".to_string());
    let current = s
        .current_streak
        .map(|st| format!("{} days", st.length))
        .unwrap_or_else(|| "none".to_string());
    let trend = match (s.recent_trend.status, s.recent_trend.change_percent) {
        (TrendStatus::Ok, Some(change)) => format_change(change),
        (TrendStatus::Ok, None) => "n/a".to_string(),
        (TrendStatus::InsufficientData, _) => "not enough data".to_string(),
    };

    let title = truncate_to_width(&format!(" XP SUMMARY · {} ", data.source), width);

    vec![
        Line::from(Span::styled(title, theme.header)),
        Line::from(Span::styled("=".repeat(width.min(60)), theme.separator)),
        Line::from(vec![
            Span::styled("Total ", theme.label),
            Span::styled(format_xp(s.total_xp), theme.value),
            Span::styled("  Activities ", theme.label),
            Span::styled(s.record_count.to_string(), theme.value),
            Span::styled("  Completion ", theme.label),
            Span::styled(format_ratio(s.completion_ratio), theme.ratio_style(s.completion_ratio)),
        ]),
        Line::from(vec![
            Span::styled("Dates ", theme.label),
            Span::styled(range, theme.text),
            Span::styled("  Study days ", theme.label),
            Span::styled(format!("{}/{}", s.study_days, s.total_days), theme.value),
            Span::styled("  Daily avg ", theme.label),
            Span::styled(format_xp(s.daily_average), theme.value),
        ]),
        Line::from(vec![
            Span::styled("Longest streak ", theme.label),
            Span::styled(streak, theme.header_accent),
            Span::styled("  Current ", theme.label),
            Span::styled(current, theme.header_accent),
            Span::styled("  Last 7 days ", theme.label),
            Span::styled(trend, theme.text),
        ]),
        Line::from(if data.diagnostics > 0 {
            Span::styled(
                format!("{} diagnostics (see export for details)", data.diagnostics),
                theme.warning,
            )
        } else {
            Span::styled("No diagnostics", theme.success)
        }),
    ]
}

/// The most recent days of `series` that fit into `inner_width` columns.
pub fn visible_days(series: &[DailyPoint], inner_width: u16) -> &[DailyPoint] {
    let fit = ((inner_width + BAR_GAP) / (BAR_WIDTH + BAR_GAP)) as usize;
    let start = series.len().saturating_sub(fit);
    &series[start..]
}

/// Render the daily XP bar chart into `area`.
pub fn render_daily_chart(frame: &mut Frame, area: Rect, series: &[DailyPoint], theme: &Theme) {
    let days = visible_days(series, area.width.saturating_sub(2));
    let bars: Vec<Bar> = days
        .iter()
        .map(|p| {
            Bar::default()
                .value(p.xp.max(0.0).round() as u64)
                .label(Line::from(p.date.format("%m-%d").to_string()))
                .style(theme.chart_bar)
        })
        .collect();

    let chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.table_border)
                .title(" Daily XP "),
        )
        .data(BarGroup::default().bars(&bars))
        .bar_width(BAR_WIDTH)
        .bar_gap(BAR_GAP)
        .value_style(theme.chart_value)
        .label_style(theme.chart_label);

    frame.render_widget(chart, area);
}

/// Render the whole summary screen.
pub fn render_summary(frame: &mut Frame, data: &SummaryViewData, theme: &Theme) {
    let area = frame.area();
    if data.summary.record_count == 0 {
        table_view::render_no_data(frame, area, theme);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(HEADER_HEIGHT),
            Constraint::Length(CHART_HEIGHT),
            Constraint::Min(4),
        ])
        .split(area);

    let header = Paragraph::new(header_lines(data, theme, area.width as usize));
    frame.render_widget(header, chunks[0]);
    render_daily_chart(frame, chunks[1], &data.summary.daily_series, theme);
    table_view::render_course_table(
        frame,
        chunks[2],
        &course_rows(&data.summary),
        &course_totals(&data.summary),
        theme,
    );
}

// ── Tests ─────────────────────────────────────────────────────────────────────
