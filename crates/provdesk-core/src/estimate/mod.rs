// Estimate aggregation: parse an uploaded cost document, obtain one exchange
// rate, and convert the total and every line item with it.

pub mod amount;
pub mod document;
pub mod rates;

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use crate::config::EstimateConfig;
use document::{parse_document, CostDocument};
use rates::{fetch_rate, providers_from_config, RateProvider, RateQuote};

#[derive(Debug, Error)]
pub enum EstimateError {
    #[error("estimate is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// One line item with both amounts.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedRow {
    pub name: String,
    pub source_amount: f64,
    pub converted_amount: f64,
}

/// Result of one upload. Every converted figure uses `quote.rate`.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimateReport {
    pub name: String,
    pub source_currency: String,
    pub target_currency: String,
    pub total_source: f64,
    pub total_converted: f64,
    pub rows: Vec<ConvertedRow>,
    pub quote: RateQuote,
}

impl EstimateReport {
    fn build(doc: CostDocument, quote: RateQuote, config: &AggregatorSettings) -> Self {
        let rate = quote.rate;
        let rows = doc
            .items
            .into_iter()
            .map(|item| ConvertedRow {
                converted_amount: item.monthly_cost * rate,
                source_amount: item.monthly_cost,
                name: item.name,
            })
            .collect();

        EstimateReport {
            name: doc.name,
            source_currency: config.source_currency.clone(),
            target_currency: config.target_currency.clone(),
            total_source: doc.total_monthly,
            total_converted: doc.total_monthly * rate,
            rows,
            quote,
        }
    }
}

struct AggregatorSettings {
    source_currency: String,
    target_currency: String,
    fallback_rate: f64,
    rate_timeout: Duration,
}

/// Stateless between uploads: each call parses, fetches a fresh rate and
/// builds a new report.
pub struct EstimateAggregator {
    providers: Vec<Box<dyn RateProvider>>,
    settings: AggregatorSettings,
}

impl EstimateAggregator {
    pub fn new(config: &EstimateConfig, providers: Vec<Box<dyn RateProvider>>) -> Self {
        EstimateAggregator {
            providers,
            settings: AggregatorSettings {
                source_currency: config.source_currency.clone(),
                target_currency: config.target_currency.clone(),
                fallback_rate: config.fallback_rate,
                rate_timeout: config.rate_timeout,
            },
        }
    }

    /// Aggregator backed by the HTTP rate sources listed in `config`.
    pub fn from_config(config: &EstimateConfig) -> Self {
        Self::new(config, providers_from_config(&config.rate_sources))
    }

    pub fn source_count(&self) -> usize {
        self.providers.len()
    }

    /// Parse `text` and convert it. Invalid JSON is reported before any rate
    /// source is contacted.
    pub async fn aggregate(&self, text: &str) -> Result<EstimateReport, EstimateError> {
        let doc = parse_document(text)?;
        info!(
            "Parsed estimate \"{}\" with {} line items",
            doc.name,
            doc.items.len()
        );

        let quote = fetch_rate(
            &self.providers,
            self.settings.fallback_rate,
            self.settings.rate_timeout,
        )
        .await;

        Ok(EstimateReport::build(doc, quote, &self.settings))
    }

    /// Read a file and aggregate its contents.
    pub async fn aggregate_file(&self, path: &Path) -> Result<EstimateReport, EstimateError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| EstimateError::Read {
                path: path.to_path_buf(),
                source: e,
            })?;
        self.aggregate(&text).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
