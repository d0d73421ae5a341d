// Screen layout: panel arrangement and sizing.
//
// +--------------------------------------------------+
// | Status Bar (1 row)                                |
// +--------------------------------------------------+
// | Main Panel (Request form or Estimate, by tab)     |
// |                                                   |
// +--------------------------------------------------+
// | Notice Banner (3 rows)                            |
// +--------------------------------------------------+
// | Help Bar (1 row)                                  |
// +--------------------------------------------------+

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Resolved screen areas for each zone.
#[derive(Debug, Clone)]
pub struct AppLayout {
    /// Top row: tab bar and in-flight indicators.
    pub status_bar: Rect,
    /// Tab-switched content area.
    pub main_panel: Rect,
    /// The single most recent notice.
    pub notice_banner: Rect,
    /// Bottom row: keyboard shortcut hints.
    pub help_bar: Rect,
}

pub fn build_layout(area: Rect) -> AppLayout {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // status bar
            Constraint::Min(6),    // main panel
            Constraint::Length(3), // notice banner
            Constraint::Length(1), // help bar
        ])
        .split(area);

    AppLayout {
        status_bar: vertical[0],
        main_panel: vertical[1],
        notice_banner: vertical[2],
        help_bar: vertical[3],
    }
}

/// Split the estimate panel into path input, summary, and item table.
pub fn split_estimate_panel(area: Rect) -> [Rect; 3] {
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // file path input
            Constraint::Length(4), // name, totals, rate
            Constraint::Min(3),    // itemized table
        ])
        .split(area);
    [parts[0], parts[1], parts[2]]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
