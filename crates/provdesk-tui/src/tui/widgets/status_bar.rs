// Status bar widget: tab bar plus endpoint and in-flight indicators.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use provdesk_core::protocol::TabId;

use crate::tui::ViewState;

/// Render the status bar into the given area.
///
/// Layout: [tab bar] | [endpoint indicator] [activity]
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let mut spans = vec![Span::raw(" ")];
    spans.extend(tab_spans(state.active_tab));
    spans.push(Span::styled("| ", Style::default().fg(Color::Gray)));

    let (dot, dot_color, label) = endpoint_indicator(state.endpoint_configured);
    spans.push(Span::styled(format!("{dot} "), Style::default().fg(dot_color)));
    spans.push(Span::styled(label, Style::default().fg(Color::White)));

    if let Some(activity) = activity_label(state) {
        spans.push(Span::styled(" | ", Style::default().fg(Color::Gray)));
        spans.push(Span::styled(
            activity,
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ));
    }

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, area);
}

/// Dot, colour and label for the submission endpoint.
pub fn endpoint_indicator(configured: bool) -> (&'static str, Color, &'static str) {
    if configured {
        ("●", Color::Green, "Endpoint configured")
    } else {
        ("●", Color::Red, "Endpoint not configured")
    }
}

/// What is currently in flight, if anything.
pub fn activity_label(state: &ViewState) -> Option<&'static str> {
    match (state.submitting, state.estimate_loading()) {
        (true, true) => Some("Submitting... Loading estimate..."),
        (true, false) => Some("Submitting..."),
        (false, true) => Some("Loading estimate..."),
        (false, false) => None,
    }
}

/// Tab indicator spans with the active tab highlighted, e.g.
/// "[1:Request] [2:Estimate]".
pub fn tab_spans(active: TabId) -> Vec<Span<'static>> {
    let tabs = [(TabId::Request, "1:Request"), (TabId::Estimate, "2:Estimate")];

    let mut spans = Vec::new();
    for (tab_id, label) in tabs {
        let style = if tab_id == active {
            Style::default()
                .fg(Color::Black)
                .bg(Color::White)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        spans.push(Span::styled(format!("[{label}]"), style));
        spans.push(Span::raw(" "));
    }
    spans
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::EstimateView;

    #[test]
    fn endpoint_indicator_colours() {
        assert_eq!(endpoint_indicator(true).1, Color::Green);
        assert_eq!(endpoint_indicator(false).1, Color::Red);
    }

    #[test]
    fn tab_spans_highlight_active() {
        let spans = tab_spans(TabId::Estimate);
        // 0=[1:Request], 1=" ", 2=[2:Estimate]
        assert!(spans[2].style.add_modifier.contains(Modifier::BOLD));
        assert!(!spans[0].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn activity_reflects_both_flags() {
        let mut state = ViewState::default();
        assert_eq!(activity_label(&state), None);
        state.submitting = true;
        assert_eq!(activity_label(&state), Some("Submitting..."));
        state.estimate = EstimateView::Loading("a.json".into());
        assert!(activity_label(&state).unwrap().contains("Loading estimate"));
    }

    #[test]
    fn render_does_not_panic_with_defaults() {
        let backend = ratatui::backend::TestBackend::new(80, 1);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        let state = ViewState::default();
        terminal
            .draw(|frame| render(frame, frame.area(), &state))
            .unwrap();
    }
}
