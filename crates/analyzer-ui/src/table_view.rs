//! Per-course table for the summary screen.
//!
//! Renders a bordered [`ratatui::widgets::Table`] with one row per course plus
//! a highlighted totals row at the bottom.

use ratatui::{
    layout::{Constraint, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use analyzer_core::formatting::{format_ratio, format_xp_value};
use analyzer_data::aggregator::SummaryStatistics;

use crate::themes::Theme;
use crate::truncate_to_width;

/// Widest course name shown before truncation.
const COURSE_COLUMN_WIDTH: u16 = 32;

/// Data for a single row of the course table.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseRow {
    pub course: String,
    pub activities: usize,
    pub total_xp: f64,
    pub average_xp: f64,
    pub completion_ratio: Option<f64>,
}

/// Totals across all rows of the table.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseTotals {
    pub courses: usize,
    pub activities: usize,
    pub total_xp: f64,
    pub completion_ratio: Option<f64>,
}

/// Rows sorted by total XP, highest first; ties by course name.
pub fn course_rows(summary: &SummaryStatistics) -> Vec<CourseRow> {
    let mut rows: Vec<CourseRow> = summary
        .per_course
        .iter()
        .map(|(course, stats)| CourseRow {
            course: course.clone(),
            activities: stats.count,
            total_xp: stats.total_xp,
            average_xp: stats.average_xp,
            completion_ratio: stats.completion_ratio,
        })
        .collect();
    rows.sort_by(|a, b| {
        b.total_xp
            .total_cmp(&a.total_xp)
            .then_with(|| a.course.cmp(&b.course))
    });
    rows
}

pub fn course_totals(summary: &SummaryStatistics) -> CourseTotals {
    CourseTotals {
        courses: summary.per_course.len(),
        activities: summary.record_count,
        total_xp: summary.total_xp,
        completion_ratio: summary.completion_ratio,
    }
}

/// Render the course table into `area`.
pub fn render_course_table(
    frame: &mut Frame,
    area: Rect,
    rows: &[CourseRow],
    totals: &CourseTotals,
    theme: &Theme,
) {
    let header_cells = ["Course", "Activities", "XP", "Avg XP", "Completion"]
        .iter()
        .map(|h| Cell::from(*h).style(theme.table_header));
    let header = Row::new(header_cells).height(1);

    let mut all_rows: Vec<Row> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let style = if i % 2 == 0 {
                theme.table_row
            } else {
                theme.table_row_alt
            };
            Row::new(vec![
                Cell::from(truncate_to_width(&row.course, COURSE_COLUMN_WIDTH as usize)),
                Cell::from(row.activities.to_string()),
                Cell::from(format_xp_value(row.total_xp)),
                Cell::from(format_xp_value(row.average_xp)),
                Cell::from(format_ratio(row.completion_ratio))
                    .style(theme.ratio_style(row.completion_ratio)),
            ])
            .style(style)
        })
        .collect();

    all_rows.push(
        Row::new(vec![
            Cell::from(format!("TOTAL ({} courses)", totals.courses)),
            Cell::from(totals.activities.to_string()),
            Cell::from(format_xp_value(totals.total_xp)),
            Cell::from(""),
            Cell::from(format_ratio(totals.completion_ratio)),
        ])
        .style(theme.table_total),
    );

    let widths = [
        Constraint::Length(COURSE_COLUMN_WIDTH),
        Constraint::Length(11),
        Constraint::Length(10),
        Constraint::Length(8),
        Constraint::Length(11),
    ];

    let table = Table::new(all_rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.table_border)
                .title(" Courses "),
        )
        .style(theme.text);

    frame.render_widget(table, area);
}

/// Placeholder shown when the document yielded no records.
pub fn render_no_data(frame: &mut Frame, area: Rect, theme: &Theme) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled("No activity found", theme.warning)),
        Line::from(""),
        Line::from(Span::styled(
            "The document contained no recognizable course activity.",
            theme.dim,
        )),
        Line::from(Span::styled("Press 'q' or Esc to exit", theme.dim)),
    ];
    frame.render_widget(
        Paragraph::new(ratatui::text::Text::from(text))
            .block(Block::default().borders(Borders::ALL).title(" XP Analyzer ")),
        area,
    );
}

// ── Tests ──────────────────────────────────────────────────────────────────────
