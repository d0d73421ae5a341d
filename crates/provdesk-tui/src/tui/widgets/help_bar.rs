// Help bar widget: key hints for the current mode.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use provdesk_core::protocol::TabId;

use crate::tui::{Focus, ViewState};

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let paragraph = Paragraph::new(Line::from(vec![Span::styled(
        hint_text(state),
        Style::default().fg(Color::White).add_modifier(Modifier::DIM),
    )]))
    .style(Style::default().bg(Color::DarkGray));
    frame.render_widget(paragraph, area);
}

pub fn hint_text(state: &ViewState) -> &'static str {
    match (state.focus, state.active_tab) {
        (Focus::EstimatePath, _) => " Enter:Load file | Esc:Done | Ctrl+C:Quit",
        (Focus::ResourceName | Focus::RequesterEmail, _) => {
            " Tab:Next field | Enter:Submit | Esc:Done | Ctrl+C:Quit"
        }
        (Focus::None, TabId::Request) => " 1-2:Tabs | Tab:Edit | Enter:Submit | q:Quit",
        (Focus::None, TabId::Estimate) => {
            " 1-2:Tabs | Tab:Edit path | Enter:Load | j/k:Scroll | q:Quit"
        }
    }
}
