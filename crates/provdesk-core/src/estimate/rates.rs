// Exchange-rate lookup: an ordered list of sources tried one after another,
// with a static fallback when every source fails.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::RateSourceConfig;

#[derive(Debug, Error)]
pub enum RateError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("source answered HTTP {0}")]
    Status(u16),

    #[error("no numeric rate at `{0}`")]
    Missing(String),

    #[error("rate {0} is not positive")]
    NonPositive(f64),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Where the rate used for a conversion came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateProvenance {
    Source(String),
    Fallback,
}

impl fmt::Display for RateProvenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateProvenance::Source(name) => write!(f, "{name}"),
            RateProvenance::Fallback => write!(f, "fallback"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RateQuote {
    pub rate: f64,
    pub provenance: RateProvenance,
}

impl RateQuote {
    pub fn is_fallback(&self) -> bool {
        self.provenance == RateProvenance::Fallback
    }
}

/// One external rate source.
#[async_trait]
pub trait RateProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_rate(&self) -> Result<f64, RateError>;
}

/// Try each provider in order and return the first positive rate.
///
/// Every attempt is bounded by `attempt_timeout`; failures are logged and
/// swallowed. If all attempts fail the `fallback` rate is returned.
pub async fn fetch_rate(
    providers: &[Box<dyn RateProvider>],
    fallback: f64,
    attempt_timeout: Duration,
) -> RateQuote {
    for provider in providers {
        let attempt = tokio::time::timeout(attempt_timeout, provider.fetch_rate()).await;
        let result = match attempt {
            Ok(Ok(rate)) if rate.is_finite() && rate > 0.0 => Ok(rate),
            Ok(Ok(rate)) => Err(RateError::NonPositive(rate)),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(RateError::Timeout(attempt_timeout)),
        };

        match result {
            Ok(rate) => {
                info!("Exchange rate {} from {}", rate, provider.name());
                return RateQuote {
                    rate,
                    provenance: RateProvenance::Source(provider.name().to_string()),
                };
            }
            Err(e) => warn!("Rate source {} failed: {}", provider.name(), e),
        }
    }

    warn!(
        "All {} rate sources failed, using fallback rate {}",
        providers.len(),
        fallback
    );
    RateQuote {
        rate: fallback,
        provenance: RateProvenance::Fallback,
    }
}

// ---------------------------------------------------------------------------
// HTTP source
// ---------------------------------------------------------------------------

/// A JSON-over-HTTP rate source; the rate sits at a dotted path in the body.
pub struct HttpRateSource {
    http: reqwest::Client,
    name: String,
    url: String,
    rate_path: String,
}

impl HttpRateSource {
    pub fn new(http: reqwest::Client, config: &RateSourceConfig) -> Self {
        HttpRateSource {
            http,
            name: config.name.clone(),
            url: config.url.clone(),
            rate_path: config.rate_path.clone(),
        }
    }
}

#[async_trait]
impl RateProvider for HttpRateSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_rate(&self) -> Result<f64, RateError> {
        let response = self.http.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RateError::Status(status.as_u16()));
        }
        let body: Value = response.json().await?;
        extract_rate(&body, &self.rate_path)
    }
}

/// Read a positive number at `path` (dot-separated keys) in `body`.
pub fn extract_rate(body: &Value, path: &str) -> Result<f64, RateError> {
    let rate = path
        .split('.')
        .try_fold(body, |node, key| node.get(key))
        .and_then(Value::as_f64)
        .ok_or_else(|| RateError::Missing(path.to_string()))?;

    if rate.is_finite() && rate > 0.0 {
        Ok(rate)
    } else {
        Err(RateError::NonPositive(rate))
    }
}

/// Build the ranked provider list from configuration, sharing one client.
pub fn providers_from_config(sources: &[RateSourceConfig]) -> Vec<Box<dyn RateProvider>> {
    let http = reqwest::Client::new();
    sources
        .iter()
        .map(|cfg| Box::new(HttpRateSource::new(http.clone(), cfg)) as Box<dyn RateProvider>)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
