// Terminal UI: layout, input handling, and widget rendering.
//
// The TUI owns a `ViewState` holding the edit buffers plus whatever the app
// orchestrator last reported. The orchestrator pushes `UiUpdate` messages over
// an mpsc channel; the TUI applies them and re-renders at ~30 fps.

pub mod input;
pub mod layout;
pub mod widgets;

use std::time::Duration;

use crossterm::event::{Event, EventStream};
use futures_util::StreamExt;
use ratatui::Frame;
use tokio::sync::mpsc;

use provdesk_core::config::FieldLabels;
use provdesk_core::estimate::EstimateReport;
use provdesk_core::notice::Notice;
use provdesk_core::protocol::{TabId, UiUpdate, UserCommand};
use provdesk_core::validation::FieldValidity;

use layout::build_layout;

// ---------------------------------------------------------------------------
// Focus
// ---------------------------------------------------------------------------

/// Which text input receives keystrokes, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    None,
    ResourceName,
    RequesterEmail,
    EstimatePath,
}

impl Focus {
    pub fn is_editing(self) -> bool {
        self != Focus::None
    }
}

// ---------------------------------------------------------------------------
// EstimateView
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default)]
pub enum EstimateView {
    #[default]
    Empty,
    Loading(String),
    Ready(Box<EstimateReport>),
    Failed(String),
}

// ---------------------------------------------------------------------------
// ViewState
// ---------------------------------------------------------------------------

/// TUI-local state read by `render_frame`.
pub struct ViewState {
    pub active_tab: TabId,
    pub focus: Focus,
    pub resource_name: String,
    pub requester_email: String,
    /// Form epoch the edit buffers belong to; sent with every field edit.
    pub form_epoch: u64,
    pub labels: FieldLabels,
    pub validity: FieldValidity,
    pub submitting: bool,
    pub endpoint_configured: bool,
    pub notice: Option<Notice>,
    pub estimate_path: String,
    pub estimate: EstimateView,
    /// First visible row of the itemized table.
    pub table_scroll: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState {
            active_tab: TabId::Request,
            focus: Focus::None,
            resource_name: String::new(),
            requester_email: String::new(),
            form_epoch: 0,
            labels: FieldLabels::default(),
            validity: FieldValidity::default(),
            submitting: false,
            endpoint_configured: false,
            notice: None,
            estimate_path: String::new(),
            estimate: EstimateView::Empty,
            table_scroll: 0,
        }
    }
}

impl ViewState {
    pub fn estimate_loading(&self) -> bool {
        matches!(self.estimate, EstimateView::Loading(_))
    }

    /// Largest useful `table_scroll`: the index of the last row.
    pub fn max_table_scroll(&self) -> usize {
        match &self.estimate {
            EstimateView::Ready(report) => report.rows.len().saturating_sub(1),
            _ => 0,
        }
    }
}

// ---------------------------------------------------------------------------
// UiUpdate processing
// ---------------------------------------------------------------------------

/// Apply a single UiUpdate to the ViewState.
pub fn apply_ui_update(state: &mut ViewState, update: UiUpdate) {
    match update {
        UiUpdate::Form(snapshot) => {
            state.labels = snapshot.labels;
            state.validity = snapshot.validity;
            state.submitting = snapshot.submitting;
            state.endpoint_configured = snapshot.endpoint_configured;
        }
        UiUpdate::FormCleared { epoch } => {
            state.form_epoch = epoch;
            state.resource_name.clear();
            state.requester_email.clear();
            if matches!(state.focus, Focus::ResourceName | Focus::RequesterEmail) {
                state.focus = Focus::None;
            }
        }
        UiUpdate::Notice(notice) => {
            state.notice = Some(notice);
        }
        UiUpdate::EstimateLoading(path) => {
            state.estimate = EstimateView::Loading(path.display().to_string());
        }
        UiUpdate::EstimateReady(report) => {
            state.estimate = EstimateView::Ready(report);
            state.table_scroll = 0;
        }
        UiUpdate::EstimateFailed(message) => {
            state.estimate = EstimateView::Failed(message);
        }
    }
}

// ---------------------------------------------------------------------------
// Render frame
// ---------------------------------------------------------------------------

/// Render the complete frame.
pub fn render_frame(frame: &mut Frame, state: &ViewState) {
    let layout = build_layout(frame.area());

    widgets::status_bar::render(frame, layout.status_bar, state);
    match state.active_tab {
        TabId::Request => widgets::request_form::render(frame, layout.main_panel, state),
        TabId::Estimate => widgets::estimate_panel::render(frame, layout.main_panel, state),
    }
    widgets::notice_banner::render(frame, layout.notice_banner, state.notice.as_ref());
    widgets::help_bar::render(frame, layout.help_bar, state);
}

// ---------------------------------------------------------------------------
// Main TUI loop
// ---------------------------------------------------------------------------

/// Run the TUI event loop.
///
/// Initializes the terminal, installs a panic hook that restores it, then
/// selects over UI updates, keyboard input and a render tick until the user
/// quits or the update channel closes.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
) -> anyhow::Result<()> {
    let mut terminal = ratatui::init();

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = ratatui::restore();
        original_hook(panic_info);
    }));

    let mut view_state = ViewState::default();
    let mut event_stream = EventStream::new();

    let mut render_tick = tokio::time::interval(Duration::from_millis(33));
    render_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            update = ui_rx.recv() => {
                match update {
                    Some(ui_update) => apply_ui_update(&mut view_state, ui_update),
                    // Channel closed: app is shutting down
                    None => break,
                }
            }

            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key_event))) => {
                        if let Some(cmd) = input::handle_key(key_event, &mut view_state) {
                            let quit = cmd == UserCommand::Quit;
                            let _ = cmd_tx.send(cmd).await;
                            if quit {
                                break;
                            }
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(_)) | None => break,
                }
            }

            _ = render_tick.tick() => {
                terminal.draw(|frame| render_frame(frame, &view_state))?;
            }
        }
    }

    ratatui::restore();

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
