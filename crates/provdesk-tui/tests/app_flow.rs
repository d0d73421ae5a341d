// End-to-end flow: key presses go through the input handler, commands reach
// the app loop, and the resulting UI updates are applied to a ViewState that
// is finally rendered to a test backend.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::backend::TestBackend;
use ratatui::Terminal;
use reqwest::Url;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use provdesk_core::config::{Endpoint, EstimateConfig, SubmissionConfig};
use provdesk_core::estimate::rates::{RateError, RateProvider};
use provdesk_core::estimate::EstimateAggregator;
use provdesk_core::notice::NoticeKind;
use provdesk_core::protocol::{UiUpdate, UserCommand};
use provdesk_core::submission::{
    RawResponse, SubmissionController, SubmissionRequest, SubmissionTransport, TransportError,
};
use provdesk_tui::app::{self, AppState};
use provdesk_tui::tui::{apply_ui_update, input, render_frame, EstimateView, Focus, ViewState};

struct ScriptedTransport {
    status: u16,
    body: &'static str,
    calls: AtomicUsize,
}

#[async_trait]
impl SubmissionTransport for ScriptedTransport {
    async fn post_json(
        &self,
        _url: &Url,
        _body: &SubmissionRequest,
    ) -> Result<RawResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(RawResponse {
            status: self.status,
            body: self.body.to_string(),
        })
    }
}

struct DownRate;

#[async_trait]
impl RateProvider for DownRate {
    fn name(&self) -> &str {
        "down"
    }

    async fn fetch_rate(&self) -> Result<f64, RateError> {
        Err(RateError::Status(503))
    }
}

/// The app loop plus the TUI-side ends of its channels.
struct Harness {
    cmd_tx: mpsc::Sender<UserCommand>,
    ui_rx: mpsc::Receiver<UiUpdate>,
    view: ViewState,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl Harness {
    fn start(endpoint: Endpoint, transport: Arc<ScriptedTransport>) -> Self {
        let controller =
            SubmissionController::new(SubmissionConfig::with_endpoint(endpoint), transport);
        let aggregator =
            EstimateAggregator::new(&EstimateConfig::default(), vec![Box::new(DownRate)]);

        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let (ui_tx, ui_rx) = mpsc::channel(256);
        let (task_tx, task_rx) = mpsc::channel(16);
        let state = AppState::new(controller, aggregator, task_tx);
        let handle = tokio::spawn(app::run(cmd_rx, task_rx, ui_tx, state));

        Harness {
            cmd_tx,
            ui_rx,
            view: ViewState::default(),
            handle,
        }
    }

    async fn press(&mut self, code: KeyCode) {
        let event = KeyEvent::new(code, KeyModifiers::NONE);
        if let Some(cmd) = input::handle_key(event, &mut self.view) {
            self.cmd_tx.send(cmd).await.unwrap();
        }
    }

    async fn type_text(&mut self, text: &str) {
        for c in text.chars() {
            self.press(KeyCode::Char(c)).await;
        }
    }

    /// Apply updates until `done` holds for the view.
    async fn settle(&mut self, done: impl Fn(&ViewState) -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !done(&self.view) {
                let update = self.ui_rx.recv().await.expect("ui channel closed");
                apply_ui_update(&mut self.view, update);
            }
        })
        .await
        .expect("view did not settle");
    }

    async fn quit(self) {
        self.cmd_tx.send(UserCommand::Quit).await.unwrap();
        self.handle.await.unwrap().unwrap();
    }
}

fn configured() -> Endpoint {
    Endpoint::Configured(Url::parse("https://hooks.example.com/provision").unwrap())
}

fn transport(status: u16, body: &'static str) -> Arc<ScriptedTransport> {
    Arc::new(ScriptedTransport {
        status,
        body,
        calls: AtomicUsize::new(0),
    })
}

fn rendered(view: &ViewState) -> String {
    let mut terminal = Terminal::new(TestBackend::new(100, 24)).unwrap();
    terminal.draw(|frame| render_frame(frame, view)).unwrap();
    terminal
        .backend()
        .buffer()
        .content
        .iter()
        .map(|cell| cell.symbol())
        .collect()
}

async fn fill_form(h: &mut Harness) {
    h.press(KeyCode::Tab).await;
    h.type_text("web-01").await;
    h.press(KeyCode::Tab).await;
    h.type_text("ops@example.com").await;
    h.settle(|v| v.validity.is_form_valid()).await;
}

#[tokio::test]
async fn typed_request_is_accepted_and_form_clears() {
    let transport = transport(200, r#"{"ok": true, "executionId": "abc123"}"#);
    let mut h = Harness::start(configured(), transport.clone());
    h.settle(|v| v.endpoint_configured).await;

    fill_form(&mut h).await;
    h.press(KeyCode::Enter).await;
    h.settle(|v| {
        v.notice
            .as_ref()
            .is_some_and(|n| n.kind == NoticeKind::Success)
            && !v.submitting
    })
    .await;

    assert!(h.view.resource_name.is_empty());
    assert!(h.view.requester_email.is_empty());
    assert_eq!(h.view.focus, Focus::None);
    assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    assert!(rendered(&h.view).contains("abc123"));

    h.quit().await;
}

#[tokio::test]
async fn rejected_request_keeps_typed_values() {
    let transport = transport(400, r#"{"ok": false, "error": "quota exceeded"}"#);
    let mut h = Harness::start(configured(), transport);

    fill_form(&mut h).await;
    h.press(KeyCode::Enter).await;
    h.settle(|v| v.notice.as_ref().is_some_and(|n| n.is_error()) && !v.submitting)
        .await;

    assert_eq!(h.view.resource_name, "web-01");
    assert_eq!(h.view.requester_email, "ops@example.com");
    assert!(rendered(&h.view).contains("quota exceeded"));

    h.quit().await;
}

#[tokio::test]
async fn unconfigured_endpoint_reports_and_never_calls_out() {
    let transport = transport(200, r#"{"ok": true}"#);
    let mut h = Harness::start(Endpoint::Unconfigured, transport.clone());

    fill_form(&mut h).await;
    h.press(KeyCode::Enter).await;
    h.settle(|v| v.notice.as_ref().is_some_and(|n| n.is_error()) && !v.submitting)
        .await;

    assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.view.resource_name, "web-01");

    h.quit().await;
}

#[tokio::test]
async fn estimate_loads_with_fallback_rate_when_sources_are_down() {
    let mut h = Harness::start(configured(), transport(200, r#"{"ok": true}"#));

    let fixture = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../provdesk-core/tests/fixtures/estimate_ja.json");

    h.press(KeyCode::Char('2')).await;
    h.press(KeyCode::Tab).await;
    h.type_text(&fixture.display().to_string()).await;
    h.press(KeyCode::Enter).await;
    h.settle(|v| matches!(v.estimate, EstimateView::Ready(_))).await;

    let EstimateView::Ready(report) = &h.view.estimate else {
        unreachable!()
    };
    assert!(report.quote.is_fallback());
    assert!((report.total_converted - 1875.0).abs() < 1e-6);

    let screen = rendered(&h.view);
    assert!(screen.contains("Web tier"));
    assert!(screen.contains("1,875"));

    // The request tab is untouched by the estimate.
    assert!(h.view.notice.is_none());

    h.quit().await;
}

#[tokio::test]
async fn missing_estimate_file_shows_failure_in_panel() {
    let mut h = Harness::start(configured(), transport(200, r#"{"ok": true}"#));

    h.press(KeyCode::Char('2')).await;
    h.press(KeyCode::Tab).await;
    h.type_text("/nonexistent/provdesk/estimate.json").await;
    h.press(KeyCode::Enter).await;
    h.settle(|v| matches!(v.estimate, EstimateView::Failed(_))).await;

    assert!(h.view.notice.is_none());

    h.quit().await;
}
