// Submission controller: form state, validity gate, the single outbound
// provisioning request, and mapping of its outcome into a `Notice`.
//
// The controller is driven from one event loop. `begin_submit` flips the
// in-flight guard and hands back a `PendingSubmission` that can be awaited
// elsewhere (e.g. a spawned task); its `SubmissionOutcome` is fed back through
// `complete`, which is the only place the guard is released.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{Endpoint, SubmissionConfig};
use crate::notice::Notice;
use crate::validation::FieldValidity;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum number of characters of an unstructured error body shown to the user.
pub const RAW_EXCERPT_LIMIT: usize = 300;

/// Shown when a successful response carries no `executionId`.
pub const MISSING_EXECUTION_ID: &str = "N/A";

pub const UNKNOWN_SERVER_ERROR: &str = "Unknown server error";

pub const UNCONFIGURED_MESSAGE: &str =
    "Configuration error: submission endpoint is not configured (set PROVDESK_ENDPOINT)";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// JSON body of the provisioning request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    pub instance_name: String,
    pub requester_email: String,
}

/// Status and body text of whatever the endpoint answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

// ---------------------------------------------------------------------------
// Transport seam
// ---------------------------------------------------------------------------

/// Performs the single outbound POST.
#[async_trait]
pub trait SubmissionTransport: Send + Sync {
    async fn post_json(
        &self,
        url: &Url,
        body: &SubmissionRequest,
    ) -> Result<RawResponse, TransportError>;
}

/// reqwest-backed transport.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubmissionTransport for HttpTransport {
    async fn post_json(
        &self,
        url: &Url,
        body: &SubmissionRequest,
    ) -> Result<RawResponse, TransportError> {
        let response = self
            .http
            .post(url.clone())
            .header(CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(RawResponse { status, body })
    }
}

// ---------------------------------------------------------------------------
// Outcome interpretation
// ---------------------------------------------------------------------------

/// How a single submit attempt ended, before it is turned into a notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// The endpoint is unset or still the placeholder; nothing was sent.
    Unconfigured,
    /// The endpoint answered (any status).
    Response(RawResponse),
    /// No response was obtained.
    Transport(String),
}

/// What the endpoint's answer means for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseVerdict {
    Accepted { execution_id: String },
    Rejected { reason: String },
}

/// Classify an endpoint response.
///
/// Accepted only for a 2xx status whose body is a JSON object with a truthy
/// `ok`. Otherwise the reason is, in order: the `error` string of a JSON
/// object body, a generic message for any other JSON object, the first
/// `RAW_EXCERPT_LIMIT` characters of a non-JSON body, or the bare status.
pub fn interpret_response(status: u16, body: &str) -> ResponseVerdict {
    let success_status = (200..300).contains(&status);

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => {
            if success_status && map.get("ok").is_some_and(is_truthy) {
                let execution_id = map
                    .get("executionId")
                    .and_then(Value::as_str)
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or(MISSING_EXECUTION_ID)
                    .to_string();
                return ResponseVerdict::Accepted { execution_id };
            }
            let reason = map
                .get("error")
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(UNKNOWN_SERVER_ERROR)
                .to_string();
            ResponseVerdict::Rejected { reason }
        }
        _ => {
            let trimmed = body.trim();
            let reason = if trimmed.is_empty() {
                format!("HTTP {status}")
            } else {
                trimmed.chars().take(RAW_EXCERPT_LIMIT).collect()
            };
            ResponseVerdict::Rejected { reason }
        }
    }
}

/// Loose truthiness for the `ok` flag: `true`, non-zero numbers and
/// non-empty strings count.
fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
        Value::Null => false,
    }
}

// ---------------------------------------------------------------------------
// PendingSubmission
// ---------------------------------------------------------------------------

/// An accepted submit waiting to be sent. Produced only by
/// `SubmissionController::begin_submit`.
pub struct PendingSubmission {
    endpoint: Endpoint,
    request: SubmissionRequest,
    timeout: Duration,
    transport: Arc<dyn SubmissionTransport>,
}

impl PendingSubmission {
    pub fn request(&self) -> &SubmissionRequest {
        &self.request
    }

    /// Send the request (at most once) and report how it ended.
    ///
    /// The configuration check happens before the transport is touched.
    pub async fn dispatch(self) -> SubmissionOutcome {
        let url = match self.endpoint {
            Endpoint::Unconfigured => {
                warn!("Submission endpoint is not configured; request not sent");
                return SubmissionOutcome::Unconfigured;
            }
            Endpoint::Configured(url) => url,
        };

        info!(
            "Submitting provisioning request for {} to {}",
            self.request.instance_name,
            url.host_str().unwrap_or("<no host>")
        );

        let attempt = self.transport.post_json(&url, &self.request);
        match tokio::time::timeout(self.timeout, attempt).await {
            Ok(Ok(response)) => SubmissionOutcome::Response(response),
            Ok(Err(e)) => SubmissionOutcome::Transport(e.to_string()),
            Err(_) => SubmissionOutcome::Transport(TransportError::Timeout(self.timeout).to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// SubmissionController
// ---------------------------------------------------------------------------

/// The two editable form fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormInput {
    pub resource_name: String,
    pub requester_email: String,
}

impl FormInput {
    fn to_request(&self) -> SubmissionRequest {
        SubmissionRequest {
            instance_name: self.resource_name.trim().to_string(),
            requester_email: self.requester_email.trim().to_string(),
        }
    }
}

pub struct SubmissionController {
    config: SubmissionConfig,
    transport: Arc<dyn SubmissionTransport>,
    form: FormInput,
    validity: FieldValidity,
    submitting: bool,
    notice: Option<Notice>,
}

impl SubmissionController {
    pub fn new(config: SubmissionConfig, transport: Arc<dyn SubmissionTransport>) -> Self {
        SubmissionController {
            config,
            transport,
            form: FormInput::default(),
            validity: FieldValidity::default(),
            submitting: false,
            notice: None,
        }
    }

    pub fn config(&self) -> &SubmissionConfig {
        &self.config
    }

    pub fn form(&self) -> &FormInput {
        &self.form
    }

    pub fn validity(&self) -> FieldValidity {
        self.validity
    }

    pub fn is_form_valid(&self) -> bool {
        self.validity.is_form_valid()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn set_resource_name(&mut self, value: &str) {
        self.form.resource_name = value.to_string();
        self.revalidate();
    }

    pub fn set_requester_email(&mut self, value: &str) {
        self.form.requester_email = value.to_string();
        self.revalidate();
    }

    fn revalidate(&mut self) {
        self.validity = FieldValidity::of(&self.form.resource_name, &self.form.requester_email);
    }

    /// Start a submission if the form is valid and nothing is in flight.
    ///
    /// Returns `None` without side effects otherwise; attempts made while a
    /// request is in flight are dropped, not queued.
    pub fn begin_submit(&mut self) -> Option<PendingSubmission> {
        if !self.is_form_valid() {
            debug!("Submit ignored: form is invalid");
            return None;
        }
        if self.submitting {
            debug!("Submit ignored: a request is already in flight");
            return None;
        }

        self.submitting = true;
        self.notice = Some(Notice::info("Submitting request..."));

        Some(PendingSubmission {
            endpoint: self.config.endpoint.clone(),
            request: self.form.to_request(),
            timeout: self.config.timeout,
            transport: Arc::clone(&self.transport),
        })
    }

    /// Finish the in-flight submission: release the guard and replace the
    /// notice. Fields are cleared only when the endpoint accepted the request.
    ///
    /// Returns `None` (and changes nothing) if no submission was in flight.
    pub fn complete(&mut self, outcome: SubmissionOutcome) -> Option<&Notice> {
        if !self.submitting {
            debug!("Discarding submission outcome with no request in flight");
            return None;
        }
        self.submitting = false;

        let notice = match outcome {
            SubmissionOutcome::Unconfigured => Notice::error(UNCONFIGURED_MESSAGE),
            SubmissionOutcome::Transport(message) => {
                warn!("Submission transport error: {}", message);
                Notice::error(format!("Network error: {message}"))
            }
            SubmissionOutcome::Response(RawResponse { status, body }) => {
                match interpret_response(status, &body) {
                    ResponseVerdict::Accepted { execution_id } => {
                        info!("Provisioning request accepted (execution id {})", execution_id);
                        self.form = FormInput::default();
                        self.revalidate();
                        Notice::success(format!(
                            "Request accepted. Execution ID: {execution_id}"
                        ))
                    }
                    ResponseVerdict::Rejected { reason } => {
                        warn!("Provisioning request rejected (HTTP {}): {}", status, reason);
                        Notice::error(format!("Request failed: {reason}"))
                    }
                }
            }
        };

        Some(&*self.notice.insert(notice))
    }

    /// `begin_submit`, `dispatch` and `complete` in one call.
    pub async fn submit(&mut self) -> Option<&Notice> {
        let pending = self.begin_submit()?;
        let outcome = pending.dispatch().await;
        self.complete(outcome)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
