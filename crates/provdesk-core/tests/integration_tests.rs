// Integration tests for provdesk-core.
//
// These drive the public API end-to-end: configuration is loaded from the
// shipped defaults, the submission controller runs against an in-memory
// transport, and the estimate aggregator runs against the JSON fixtures with
// in-memory rate providers.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::Url;

use provdesk_core::config::*;
use provdesk_core::estimate::rates::{RateError, RateProvenance, RateProvider};
use provdesk_core::estimate::{EstimateAggregator, EstimateError};
use provdesk_core::notice::NoticeKind;
use provdesk_core::submission::*;
use provdesk_core::validation::{is_valid_email, is_valid_name};

// ===========================================================================
// Test helpers
// ===========================================================================

/// Workspace root, where `defaults/` lives.
fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// A scratch base dir whose `defaults/` is a copy of the shipped one.
fn scratch_with_defaults(name: &str) -> PathBuf {
    let tmp = std::env::temp_dir().join(name);
    let _ = fs::remove_dir_all(&tmp);
    fs::create_dir_all(tmp.join("defaults")).unwrap();
    for file in [CONFIG_FILE_NAME, "provdesk.toml.example"] {
        fs::copy(
            project_root().join("defaults").join(file),
            tmp.join("defaults").join(file),
        )
        .unwrap();
    }
    tmp
}

struct RecordingTransport {
    replies: Mutex<VecDeque<Result<RawResponse, TransportError>>>,
    calls: AtomicUsize,
}

impl RecordingTransport {
    fn new(replies: Vec<Result<RawResponse, TransportError>>) -> Arc<Self> {
        Arc::new(RecordingTransport {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubmissionTransport for RecordingTransport {
    async fn post_json(
        &self,
        _url: &Url,
        _body: &SubmissionRequest,
    ) -> Result<RawResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Other("no reply queued".into())))
    }
}

fn reply(status: u16, body: &str) -> Result<RawResponse, TransportError> {
    Ok(RawResponse {
        status,
        body: body.to_string(),
    })
}

fn configured() -> SubmissionConfig {
    let url = Url::parse("https://hooks.example.com/provision").unwrap();
    SubmissionConfig::with_endpoint(Endpoint::Configured(url))
}

fn filled(config: SubmissionConfig, transport: Arc<RecordingTransport>) -> SubmissionController {
    let mut c = SubmissionController::new(config, transport);
    c.set_resource_name("web-01");
    c.set_requester_email("ops@example.com");
    c
}

struct Rate {
    name: &'static str,
    value: Result<f64, u16>,
}

#[async_trait]
impl RateProvider for Rate {
    fn name(&self) -> &str {
        self.name
    }

    async fn fetch_rate(&self) -> Result<f64, RateError> {
        self.value.map_err(RateError::Status)
    }
}

fn aggregator(values: Vec<Result<f64, u16>>) -> EstimateAggregator {
    let names = ["primary", "secondary"];
    let providers = values
        .into_iter()
        .zip(names)
        .map(|(value, name)| Box::new(Rate { name, value }) as Box<dyn RateProvider>)
        .collect();
    EstimateAggregator::new(&EstimateConfig::default(), providers)
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

// ===========================================================================
// Configuration
// ===========================================================================

#[test]
fn shipped_defaults_load_as_unconfigured() {
    let tmp = scratch_with_defaults("provdesk_it_defaults");
    let copied = ensure_config_files(&tmp).unwrap();
    assert_eq!(copied.len(), 1, "only provdesk.toml is seeded");

    let config = load_config_from(&tmp, None).unwrap();
    assert_eq!(config.submission.endpoint, Endpoint::Unconfigured);
    assert_eq!(config.submission.timeout, DEFAULT_SUBMIT_TIMEOUT);
    assert_eq!(config.estimate.rate_sources, EstimateConfig::default().rate_sources);
    assert!(approx(config.estimate.fallback_rate, 150.0));

    let _ = fs::remove_dir_all(&tmp);
}

#[test]
fn environment_override_configures_shipped_defaults() {
    let tmp = scratch_with_defaults("provdesk_it_override");
    ensure_config_files(&tmp).unwrap();

    let config =
        load_config_from(&tmp, Some("https://hooks.example.com/provision".into())).unwrap();
    assert!(config.submission.endpoint.is_configured());

    let _ = fs::remove_dir_all(&tmp);
}

#[test]
fn example_config_is_loadable() {
    let tmp = scratch_with_defaults("provdesk_it_example");
    fs::create_dir_all(tmp.join("config")).unwrap();
    fs::copy(
        tmp.join("defaults/provdesk.toml.example"),
        tmp.join("config").join(CONFIG_FILE_NAME),
    )
    .unwrap();

    let config = load_config_from(&tmp, None).unwrap();
    assert!(config.submission.endpoint.is_configured());
    assert_eq!(config.submission.labels.resource_name, "Bucket name");
    assert_eq!(config.estimate.rate_sources.len(), 1);

    let _ = fs::remove_dir_all(&tmp);
}

// ===========================================================================
// Validation
// ===========================================================================

#[test]
fn name_validity_over_lengths() {
    for len in 0..=40 {
        let candidate = "a".repeat(len);
        assert_eq!(
            is_valid_name(&candidate),
            (3..=32).contains(&len),
            "length {len}"
        );
    }
    for bad in ["web_01", "web 01", "wéb", "web.01", "web-01\n"] {
        assert!(!is_valid_name(bad), "{bad:?} should be invalid");
    }
}

#[test]
fn email_validity_shapes() {
    for good in ["a@b.c", "ops@example.com", "first.last@sub.example.co.jp"] {
        assert!(is_valid_email(good), "{good:?} should be valid");
    }
    for bad in ["", "ops", "ops@example", "ops@@example.com", "o ps@example.com", "ops@exa mple.com"] {
        assert!(!is_valid_email(bad), "{bad:?} should be invalid");
    }
}

// ===========================================================================
// Submission
// ===========================================================================

#[tokio::test]
async fn invalid_form_is_never_sent() {
    let transport = RecordingTransport::new(vec![reply(200, r#"{"ok": true}"#)]);
    let mut c = SubmissionController::new(configured(), transport.clone());
    c.set_resource_name("ok-name");
    c.set_requester_email("not-an-email");

    assert!(c.submit().await.is_none());
    assert!(c.begin_submit().is_none());
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn in_flight_submit_blocks_a_second_one() {
    let transport = RecordingTransport::new(vec![reply(200, r#"{"ok": true}"#)]);
    let mut c = filled(configured(), transport.clone());

    let pending = c.begin_submit().unwrap();
    assert!(c.begin_submit().is_none());
    let outcome = pending.dispatch().await;
    c.complete(outcome);
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn placeholder_endpoint_from_defaults_yields_configuration_error() {
    let tmp = scratch_with_defaults("provdesk_it_placeholder_submit");
    ensure_config_files(&tmp).unwrap();
    let config = load_config_from(&tmp, None).unwrap();

    let transport = RecordingTransport::new(vec![reply(200, r#"{"ok": true}"#)]);
    let mut c = filled(config.submission, transport.clone());
    let notice = c.submit().await.cloned().unwrap();

    assert_eq!(notice.kind, NoticeKind::Error);
    assert_eq!(notice.message, UNCONFIGURED_MESSAGE);
    assert_eq!(transport.calls(), 0);
    assert!(!c.is_submitting());

    let _ = fs::remove_dir_all(&tmp);
}

#[tokio::test]
async fn accepted_request_shows_execution_id_and_clears_fields() {
    let transport =
        RecordingTransport::new(vec![reply(200, r#"{"ok": true, "executionId": "abc123"}"#)]);
    let mut c = filled(configured(), transport);

    let notice = c.submit().await.cloned().unwrap();
    assert_eq!(notice.kind, NoticeKind::Success);
    assert!(notice.message.contains("abc123"));
    assert_eq!(c.form().resource_name, "");
    assert_eq!(c.form().requester_email, "");
    assert!(!c.is_submitting());
}

#[tokio::test]
async fn rejected_request_keeps_fields() {
    let transport =
        RecordingTransport::new(vec![reply(400, r#"{"ok": false, "error": "quota exceeded"}"#)]);
    let mut c = filled(configured(), transport);

    let notice = c.submit().await.cloned().unwrap();
    assert_eq!(notice.kind, NoticeKind::Error);
    assert!(notice.message.contains("quota exceeded"));
    assert_eq!(c.form().resource_name, "web-01");
    assert_eq!(c.form().requester_email, "ops@example.com");
    assert!(!c.is_submitting());
}

#[tokio::test]
async fn transport_failure_reports_message_and_releases_guard() {
    let transport = RecordingTransport::new(vec![Err(TransportError::Other(
        "dns error: no such host".into(),
    ))]);
    let mut c = filled(configured(), transport);

    let notice = c.submit().await.cloned().unwrap();
    assert_eq!(notice.kind, NoticeKind::Error);
    assert!(notice.message.contains("dns error: no such host"));
    assert!(!c.is_submitting());

    // The controller accepts a new attempt afterwards.
    assert!(c.begin_submit().is_some());
}

// ===========================================================================
// Estimate aggregation
// ===========================================================================

#[tokio::test]
async fn japanese_export_converts_at_one_rate() {
    let agg = aggregator(vec![Ok(150.0)]);
    let report = agg.aggregate_file(&fixture("estimate_ja.json")).await.unwrap();

    assert_eq!(report.name, "Web tier");
    assert!(approx(report.total_source, 12.5));
    assert!(approx(report.total_converted, 1875.0));
    let rows: Vec<(&str, f64, f64)> = report
        .rows
        .iter()
        .map(|r| (r.name.as_str(), r.source_amount, r.converted_amount))
        .collect();
    assert_eq!(rows, vec![("A", 5.0, 750.0), ("B", 7.5, 1125.0)]);
}

#[tokio::test]
async fn english_export_is_understood() {
    let agg = aggregator(vec![Ok(100.0)]);
    let report = agg.aggregate_file(&fixture("estimate_en.json")).await.unwrap();
    assert_eq!(report.name, "Batch cluster");
    assert!(approx(report.total_source, 1000.0));
    assert!(approx(report.total_converted, 100_000.0));
    assert_eq!(report.rows[0].name, "Amazon EC2");
}

#[tokio::test]
async fn missing_total_uses_item_sum() {
    let text = r#"{"グループ": {"サービス": [
        {"サービス名": "x", "サービスのコスト": {"毎月": "3.00"}},
        {"サービス名": "y", "サービスのコスト": {"毎月": "4.00"}}
    ]}}"#;
    let report = aggregator(vec![Ok(150.0)]).aggregate(text).await.unwrap();
    assert!(approx(report.total_source, 7.0));
}

#[tokio::test]
async fn zero_total_with_items_uses_item_sum() {
    let agg = aggregator(vec![Ok(150.0)]);
    let report = agg
        .aggregate_file(&fixture("estimate_zero_total.json"))
        .await
        .unwrap();
    assert!(approx(report.total_source, 7.0));
    assert!(approx(report.total_converted, 1050.0));
}

#[tokio::test]
async fn all_rate_sources_failing_still_completes_with_fallback() {
    let agg = aggregator(vec![Err(503), Err(500)]);
    let report = agg.aggregate_file(&fixture("estimate_ja.json")).await.unwrap();
    assert_eq!(report.quote.provenance, RateProvenance::Fallback);
    assert!(approx(report.quote.rate, 150.0));
    assert!(approx(report.total_converted, 1875.0));
}

#[tokio::test]
async fn secondary_source_used_when_primary_fails() {
    let agg = aggregator(vec![Err(503), Ok(149.0)]);
    let report = agg.aggregate_file(&fixture("estimate_ja.json")).await.unwrap();
    assert_eq!(
        report.quote.provenance,
        RateProvenance::Source("secondary".into())
    );
    assert!(approx(report.rows[0].converted_amount, 745.0));
}

#[tokio::test]
async fn reupload_yields_identical_report() {
    let agg = aggregator(vec![Ok(150.0)]);
    let path = fixture("estimate_ja.json");
    let first = agg.aggregate_file(&path).await.unwrap();
    let second = agg.aggregate_file(&path).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(second.rows.len(), 2);
}

#[tokio::test]
async fn malformed_upload_is_a_parse_error() {
    let err = aggregator(vec![Ok(150.0)])
        .aggregate(r#"{"名前": "truncated""#)
        .await
        .unwrap_err();
    assert!(matches!(err, EstimateError::Parse(_)));
}
