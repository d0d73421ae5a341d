// Messages exchanged between the terminal UI and the app event loop.
//
// `UserCommand` flows TUI -> app, `UiUpdate` flows app -> TUI. The TUI keeps
// its own edit buffers and forwards every change; the app answers with
// snapshots derived from the controller.
//
// Every clear of the form starts a new epoch. Edits carry the epoch the TUI
// had when they were typed, so an edit sent before the TUI saw the clear is
// dropped instead of refilling the controller with stale text.

use std::path::PathBuf;

use crate::config::FieldLabels;
use crate::estimate::EstimateReport;
use crate::notice::Notice;
use crate::validation::FieldValidity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabId {
    Request,
    Estimate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    ResourceName,
    RequesterEmail,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    /// A form field's full current text, typed during form epoch `epoch`.
    EditField {
        field: FormField,
        value: String,
        epoch: u64,
    },
    Submit,
    LoadEstimate(PathBuf),
    Quit,
}

/// Controller-derived form state the TUI cannot compute on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct FormSnapshot {
    pub labels: FieldLabels,
    pub validity: FieldValidity,
    pub submitting: bool,
    pub endpoint_configured: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    Form(FormSnapshot),
    /// The endpoint accepted the request; both fields were emptied and edits
    /// from before `epoch` are ignored.
    FormCleared { epoch: u64 },
    Notice(Notice),
    EstimateLoading(PathBuf),
    EstimateReady(Box<EstimateReport>),
    EstimateFailed(String),
}
