// Notice banner widget: the most recent success/error/info message.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use provdesk_core::notice::{Notice, NoticeKind};

pub fn render(frame: &mut Frame, area: Rect, notice: Option<&Notice>) {
    let (content, border) = match notice {
        Some(n) => {
            let color = kind_color(n.kind);
            let line = Line::from(vec![
                Span::styled(
                    format!("{} ", n.at.format("%H:%M:%S")),
                    Style::default().fg(Color::Gray),
                ),
                Span::styled(
                    n.message.clone(),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ),
            ]);
            (line, color)
        }
        None => (
            Line::from(Span::styled("No messages", Style::default().fg(Color::DarkGray))),
            Color::Gray,
        ),
    };

    let paragraph = Paragraph::new(content)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border))
                .title("Status"),
        );
    frame.render_widget(paragraph, area);
}

pub fn kind_color(kind: NoticeKind) -> Color {
    match kind {
        NoticeKind::Success => Color::Green,
        NoticeKind::Error => Color::Red,
        NoticeKind::Info => Color::Cyan,
    }
}
