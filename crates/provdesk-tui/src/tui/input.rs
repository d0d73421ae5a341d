// Keyboard input handling and command dispatch.
//
// Translates crossterm key events into UserCommand messages sent to the app
// orchestrator, or into local ViewState mutations (tab switching, focus,
// edit buffers, table scrolling).

use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use provdesk_core::protocol::{FormField, TabId, UserCommand};

use super::{Focus, ViewState};

/// Handle a keyboard event.
///
/// Returns `Some(UserCommand)` when the key press must reach the app
/// orchestrator (field edits, submit, estimate load, quit). Returns `None`
/// when it was handled locally.
pub fn handle_key(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    // On Windows crossterm also reports key releases.
    if key_event.kind != KeyEventKind::Press {
        return None;
    }

    // Ctrl+C always quits, even while editing.
    if key_event.modifiers.contains(KeyModifiers::CONTROL) && key_event.code == KeyCode::Char('c')
    {
        return Some(UserCommand::Quit);
    }

    if view_state.focus.is_editing() {
        return handle_edit_mode(key_event, view_state);
    }

    match key_event.code {
        KeyCode::Char('1') => {
            view_state.active_tab = TabId::Request;
            None
        }
        KeyCode::Char('2') => {
            view_state.active_tab = TabId::Estimate;
            None
        }
        KeyCode::Tab | KeyCode::Char('e') => {
            view_state.focus = first_focus(view_state.active_tab);
            None
        }
        KeyCode::Enter => match view_state.active_tab {
            TabId::Request => Some(UserCommand::Submit),
            TabId::Estimate => load_estimate(view_state).or_else(|| {
                view_state.focus = Focus::EstimatePath;
                None
            }),
        },
        KeyCode::Up | KeyCode::Char('k') => {
            view_state.table_scroll = view_state.table_scroll.saturating_sub(1);
            None
        }
        KeyCode::Down | KeyCode::Char('j') => {
            view_state.table_scroll = view_state
                .table_scroll
                .saturating_add(1)
                .min(view_state.max_table_scroll());
            None
        }
        KeyCode::Char('q') => Some(UserCommand::Quit),
        _ => None,
    }
}

/// Key handling while a text input has focus.
///
/// - Printable characters are appended, Backspace removes the last one
/// - Tab moves to the next input on the same tab
/// - Enter submits the form or loads the estimate
/// - Esc leaves edit mode, keeping the text
fn handle_edit_mode(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Esc => {
            view_state.focus = Focus::None;
            None
        }
        KeyCode::Tab => {
            view_state.focus = next_focus(view_state.focus);
            None
        }
        KeyCode::BackTab => {
            // Each tab has at most two inputs, so previous == next.
            view_state.focus = next_focus(view_state.focus);
            None
        }
        KeyCode::Enter => match view_state.focus {
            Focus::EstimatePath => load_estimate(view_state),
            _ => Some(UserCommand::Submit),
        },
        KeyCode::Backspace => {
            let buffer = focused_buffer(view_state)?;
            buffer.pop();
            edit_command(view_state)
        }
        KeyCode::Char(_)
            if key_event
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            None
        }
        KeyCode::Char(c) => {
            let buffer = focused_buffer(view_state)?;
            buffer.push(c);
            edit_command(view_state)
        }
        _ => None,
    }
}

fn first_focus(tab: TabId) -> Focus {
    match tab {
        TabId::Request => Focus::ResourceName,
        TabId::Estimate => Focus::EstimatePath,
    }
}

fn next_focus(focus: Focus) -> Focus {
    match focus {
        Focus::ResourceName => Focus::RequesterEmail,
        Focus::RequesterEmail => Focus::ResourceName,
        Focus::EstimatePath => Focus::EstimatePath,
        Focus::None => Focus::None,
    }
}

fn focused_buffer(view_state: &mut ViewState) -> Option<&mut String> {
    match view_state.focus {
        Focus::ResourceName => Some(&mut view_state.resource_name),
        Focus::RequesterEmail => Some(&mut view_state.requester_email),
        Focus::EstimatePath => Some(&mut view_state.estimate_path),
        Focus::None => None,
    }
}

/// The edit to forward for the focused form field. The estimate path stays
/// local until Enter.
fn edit_command(view_state: &ViewState) -> Option<UserCommand> {
    let (field, value) = match view_state.focus {
        Focus::ResourceName => (FormField::ResourceName, &view_state.resource_name),
        Focus::RequesterEmail => (FormField::RequesterEmail, &view_state.requester_email),
        Focus::EstimatePath | Focus::None => return None,
    };
    Some(UserCommand::EditField {
        field,
        value: value.clone(),
        epoch: view_state.form_epoch,
    })
}

fn load_estimate(view_state: &ViewState) -> Option<UserCommand> {
    let path = view_state.estimate_path.trim();
    if path.is_empty() || view_state.estimate_loading() {
        return None;
    }
    Some(UserCommand::LoadEstimate(PathBuf::from(path)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
