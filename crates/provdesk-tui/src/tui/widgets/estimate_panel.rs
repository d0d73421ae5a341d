// Estimate panel widget: file-path input, report summary, and the itemized
// conversion table.
//
// Scrollable table: Service, source amount, converted amount. The summary
// names the rate and where it came from so a fallback conversion is visible.

use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table};
use ratatui::Frame;

use provdesk_core::estimate::rates::RateProvenance;
use provdesk_core::estimate::EstimateReport;

use crate::tui::layout::split_estimate_panel;
use crate::tui::{EstimateView, Focus, ViewState};

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let [path_area, summary_area, table_area] = split_estimate_panel(area);

    render_path_input(frame, path_area, state);

    match &state.estimate {
        EstimateView::Empty => {
            render_message(
                frame,
                summary_area,
                "Enter the path of an exported estimate (JSON).",
                Color::Gray,
            );
            render_empty_table(frame, table_area);
        }
        EstimateView::Loading(path) => {
            let message = format!("Loading {path}...");
            render_message(frame, summary_area, &message, Color::Yellow);
            render_empty_table(frame, table_area);
        }
        EstimateView::Failed(message) => {
            render_message(frame, summary_area, message, Color::Red);
            render_empty_table(frame, table_area);
        }
        EstimateView::Ready(report) => {
            frame.render_widget(
                Paragraph::new(summary_lines(report))
                    .block(Block::default().borders(Borders::ALL).title("Estimate")),
                summary_area,
            );
            render_table(frame, table_area, report, state.table_scroll);
        }
    }
}

fn render_path_input(frame: &mut Frame, area: Rect, state: &ViewState) {
    let focused = state.focus == Focus::EstimatePath;
    let border = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(" Estimate file ");
    frame.render_widget(
        Paragraph::new(state.estimate_path.clone()).block(block),
        area,
    );

    if focused && area.width > 2 && area.height > 2 {
        let offset = state
            .estimate_path
            .chars()
            .count()
            .min(usize::from(area.width - 3)) as u16;
        frame.set_cursor_position((area.x + 1 + offset, area.y + 1));
    }
}

fn render_message(frame: &mut Frame, area: Rect, message: &str, color: Color) {
    let paragraph = Paragraph::new(Span::styled(message.to_string(), Style::default().fg(color)))
        .block(Block::default().borders(Borders::ALL).title("Estimate"));
    frame.render_widget(paragraph, area);
}

/// Name, converted total and the rate used.
pub fn summary_lines(report: &EstimateReport) -> Vec<Line<'static>> {
    let rate_color = match report.quote.provenance {
        RateProvenance::Source(_) => Color::Gray,
        RateProvenance::Fallback => Color::Yellow,
    };
    vec![
        Line::from(vec![
            Span::styled(
                report.name.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!(
                "  {} {}  ->  {} {}",
                format_amount(report.total_source, 2),
                report.source_currency,
                format_amount(report.total_converted, 0),
                report.target_currency,
            )),
        ]),
        Line::from(Span::styled(
            format!(
                "1 {} = {} {} ({})",
                report.source_currency,
                format_amount(report.quote.rate, 2),
                report.target_currency,
                provenance_label(&report.quote.provenance),
            ),
            Style::default().fg(rate_color),
        )),
    ]
}

pub fn provenance_label(provenance: &RateProvenance) -> String {
    match provenance {
        RateProvenance::Source(name) => format!("via {name}"),
        RateProvenance::Fallback => "fallback rate, all sources failed".to_string(),
    }
}

fn table_widths() -> [Constraint; 3] {
    [
        Constraint::Min(20),
        Constraint::Length(16),
        Constraint::Length(18),
    ]
}

fn header(report: Option<&EstimateReport>) -> Row<'static> {
    let (src, dst) = report
        .map(|r| (r.source_currency.clone(), r.target_currency.clone()))
        .unwrap_or_default();
    Row::new(vec![
        Cell::from("Service"),
        Cell::from(format!("Monthly {src}")),
        Cell::from(format!("Monthly {dst}")),
    ])
    .style(
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    )
}

fn render_empty_table(frame: &mut Frame, area: Rect) {
    let table = Table::new(Vec::<Row>::new(), table_widths())
        .header(header(None))
        .block(Block::default().borders(Borders::ALL).title("Line items"));
    frame.render_widget(table, area);
}

fn render_table(frame: &mut Frame, area: Rect, report: &EstimateReport, scroll: usize) {
    let skip = scroll.min(report.rows.len().saturating_sub(1));
    let rows: Vec<Row> = report
        .rows
        .iter()
        .skip(skip)
        .map(|row| {
            Row::new(vec![
                Cell::from(row.name.clone()),
                Cell::from(format_amount(row.source_amount, 2)),
                Cell::from(format_amount(row.converted_amount, 0)),
            ])
        })
        .collect();

    let title = format!("Line items ({})", report.rows.len());
    let table = Table::new(rows, table_widths())
        .header(header(Some(report)))
        .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(table, area);
}

/// Fixed-point with thousands separators: `format_amount(1875.0, 0)` is
/// "1,875", `format_amount(-1234.5, 2)` is "-1,234.50".
pub fn format_amount(value: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if value < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}
