// Request form widget: the two labelled inputs, live validity markers, and
// the submit line.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::tui::{Focus, ViewState};

const NAME_HINT: &str = "3-32 letters, digits or hyphens";
const EMAIL_HINT: &str = "name@domain.tld";

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Provisioning request");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // resource name
            Constraint::Length(3), // requester email
            Constraint::Length(1), // submit line
            Constraint::Min(0),
        ])
        .split(inner);

    render_input(
        frame,
        rows[0],
        &state.labels.resource_name,
        &state.resource_name,
        state.validity.name,
        NAME_HINT,
        state.focus == Focus::ResourceName,
    );
    render_input(
        frame,
        rows[1],
        &state.labels.requester_email,
        &state.requester_email,
        state.validity.email,
        EMAIL_HINT,
        state.focus == Focus::RequesterEmail,
    );
    frame.render_widget(Paragraph::new(submit_line(state)), rows[2]);
}

fn render_input(
    frame: &mut Frame,
    area: Rect,
    label: &str,
    value: &str,
    valid: bool,
    hint: &str,
    focused: bool,
) {
    let (marker, marker_color) = validity_marker(value, valid);
    let mut title = vec![
        Span::raw(format!(" {label} ")),
        Span::styled(format!("{marker} "), Style::default().fg(marker_color)),
    ];
    if !value.is_empty() && !valid {
        title.push(Span::styled(
            format!("({hint}) "),
            Style::default().fg(Color::DarkGray),
        ));
    }

    let border = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(Line::from(title));

    frame.render_widget(Paragraph::new(value.to_string()).block(block), area);

    if focused && area.width > 2 && area.height > 2 {
        let offset = value.chars().count().min(usize::from(area.width - 3)) as u16;
        frame.set_cursor_position((area.x + 1 + offset, area.y + 1));
    }
}

/// Marker shown next to a field label. Empty fields are neutral.
pub fn validity_marker(value: &str, valid: bool) -> (&'static str, Color) {
    if value.is_empty() {
        ("·", Color::DarkGray)
    } else if valid {
        ("✓", Color::Green)
    } else {
        ("✗", Color::Red)
    }
}

/// The submit control: disabled while invalid or in flight.
pub fn submit_line(state: &ViewState) -> Line<'static> {
    if state.submitting {
        return Line::from(Span::styled(
            " [ Submitting... ]",
            Style::default().fg(Color::Yellow),
        ));
    }
    if state.validity.is_form_valid() {
        Line::from(Span::styled(
            " [ Submit: Enter ]",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        ))
    } else {
        Line::from(Span::styled(
            " [ Submit ] fill in both fields",
            Style::default().fg(Color::DarkGray),
        ))
    }
}
