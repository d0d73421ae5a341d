// Application state and orchestration logic.
//
// The event loop owns both logic units. User commands arrive from the TUI;
// network work (the provisioning POST, the estimate's rate lookup) runs in
// spawned tasks that report back over the task channel, so every state
// mutation happens here on the loop.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use provdesk_core::estimate::{EstimateAggregator, EstimateError, EstimateReport};
use provdesk_core::notice::NoticeKind;
use provdesk_core::protocol::{FormField, FormSnapshot, UiUpdate, UserCommand};
use provdesk_core::submission::{SubmissionController, SubmissionOutcome};

// ---------------------------------------------------------------------------
// Task events
// ---------------------------------------------------------------------------

/// Results of background work, delivered back to the event loop.
#[derive(Debug)]
pub enum TaskEvent {
    SubmissionFinished(SubmissionOutcome),
    EstimateFinished {
        path: PathBuf,
        result: Result<EstimateReport, EstimateError>,
    },
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

pub struct AppState {
    pub submission: SubmissionController,
    pub aggregator: Arc<EstimateAggregator>,
    /// Set while an estimate is being aggregated; further loads are dropped.
    pub estimate_loading: bool,
    /// Bumped every time the form is cleared; edits from older epochs are stale.
    pub form_epoch: u64,
    task_tx: mpsc::Sender<TaskEvent>,
}

impl AppState {
    pub fn new(
        submission: SubmissionController,
        aggregator: EstimateAggregator,
        task_tx: mpsc::Sender<TaskEvent>,
    ) -> Self {
        AppState {
            submission,
            aggregator: Arc::new(aggregator),
            estimate_loading: false,
            form_epoch: 0,
            task_tx,
        }
    }

    pub fn form_snapshot(&self) -> FormSnapshot {
        let config = self.submission.config();
        FormSnapshot {
            labels: config.labels.clone(),
            validity: self.submission.validity(),
            submitting: self.submission.is_submitting(),
            endpoint_configured: config.endpoint.is_configured(),
        }
    }

    /// Start a submission in the background. Returns `false` when the
    /// controller refused it (invalid form or already in flight).
    pub fn start_submission(&mut self) -> bool {
        let Some(pending) = self.submission.begin_submit() else {
            return false;
        };
        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            let outcome = pending.dispatch().await;
            let _ = tx.send(TaskEvent::SubmissionFinished(outcome)).await;
        });
        true
    }

    /// Start aggregating `path` in the background. Returns `false` while a
    /// previous load is still running.
    pub fn start_estimate(&mut self, path: PathBuf) -> bool {
        if self.estimate_loading {
            debug!("Estimate load ignored: one is already running");
            return false;
        }
        self.estimate_loading = true;
        info!("Loading estimate from {}", path.display());

        let aggregator = Arc::clone(&self.aggregator);
        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            let result = aggregator.aggregate_file(&path).await;
            let _ = tx.send(TaskEvent::EstimateFinished { path, result }).await;
        });
        true
    }
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

/// Run the main application event loop.
///
/// Listens on the TUI command channel and the background task channel and
/// pushes UI updates through `ui_tx`. Returns when `Quit` arrives or the
/// command channel closes.
pub async fn run(
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    mut task_rx: mpsc::Receiver<TaskEvent>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("Application event loop started");

    let _ = ui_tx.send(UiUpdate::Form(state.form_snapshot())).await;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => handle_user_command(&mut state, cmd, &ui_tx).await,
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }

            // AppState holds a sender, so this channel never closes while
            // the loop is running.
            Some(event) = task_rx.recv() => {
                handle_task_event(&mut state, event, &ui_tx).await;
            }
        }
    }

    info!("Application event loop exiting");
    Ok(())
}

async fn handle_user_command(
    state: &mut AppState,
    cmd: UserCommand,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    match cmd {
        UserCommand::EditField {
            field,
            value,
            epoch,
        } => {
            if epoch != state.form_epoch {
                debug!(
                    "Dropping {:?} edit from form epoch {} (current {})",
                    field, epoch, state.form_epoch
                );
                return;
            }
            match field {
                FormField::ResourceName => state.submission.set_resource_name(&value),
                FormField::RequesterEmail => state.submission.set_requester_email(&value),
            }
            let _ = ui_tx.send(UiUpdate::Form(state.form_snapshot())).await;
        }
        UserCommand::Submit => {
            if state.start_submission() {
                if let Some(notice) = state.submission.notice() {
                    let _ = ui_tx.send(UiUpdate::Notice(notice.clone())).await;
                }
                let _ = ui_tx.send(UiUpdate::Form(state.form_snapshot())).await;
            }
        }
        UserCommand::LoadEstimate(path) => {
            if state.start_estimate(path.clone()) {
                let _ = ui_tx.send(UiUpdate::EstimateLoading(path)).await;
            }
        }
        UserCommand::Quit => {
            // Handled in the main loop
        }
    }
}

async fn handle_task_event(
    state: &mut AppState,
    event: TaskEvent,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    match event {
        TaskEvent::SubmissionFinished(outcome) => {
            let Some(notice) = state.submission.complete(outcome).cloned() else {
                return;
            };
            if notice.kind == NoticeKind::Success {
                state.form_epoch += 1;
                let _ = ui_tx
                    .send(UiUpdate::FormCleared {
                        epoch: state.form_epoch,
                    })
                    .await;
            }
            let _ = ui_tx.send(UiUpdate::Notice(notice)).await;
            let _ = ui_tx.send(UiUpdate::Form(state.form_snapshot())).await;
        }
        TaskEvent::EstimateFinished { path, result } => {
            state.estimate_loading = false;
            match result {
                Ok(report) => {
                    info!(
                        "Estimate \"{}\" converted at {} ({})",
                        report.name, report.quote.rate, report.quote.provenance
                    );
                    let _ = ui_tx.send(UiUpdate::EstimateReady(Box::new(report))).await;
                }
                Err(e) => {
                    warn!("Estimate {} failed: {}", path.display(), e);
                    let _ = ui_tx.send(UiUpdate::EstimateFailed(e.to_string())).await;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
