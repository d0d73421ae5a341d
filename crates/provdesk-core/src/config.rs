// Configuration loading and parsing (config/provdesk.toml plus environment overrides).

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Name of the configuration file inside `config/` (and `defaults/`).
pub const CONFIG_FILE_NAME: &str = "provdesk.toml";

/// Environment variable that overrides `submission.endpoint`.
pub const ENDPOINT_ENV_VAR: &str = "PROVDESK_ENDPOINT";

/// Placeholder shipped in the default config; treated as "unconfigured".
pub const DEFAULT_PLACEHOLDER: &str = "YOUR_ENDPOINT_URL";

pub const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RATE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_FALLBACK_RATE: f64 = 150.0;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub submission: SubmissionConfig,
    pub estimate: EstimateConfig,
}

// ---------------------------------------------------------------------------
// Endpoint
// ---------------------------------------------------------------------------

/// Destination of the provisioning request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// No address was supplied, or the shipped placeholder was left in place.
    Unconfigured,
    /// A parsed http(s) address.
    Configured(Url),
}

impl Endpoint {
    /// Resolve a raw configured address into an `Endpoint`.
    ///
    /// Empty input and input equal to `placeholder` (after trimming) are
    /// `Unconfigured`. Anything else must parse as an http or https URL.
    pub fn resolve(raw: Option<&str>, placeholder: &str) -> Result<Self, ConfigError> {
        let raw = match raw.map(str::trim) {
            None | Some("") => return Ok(Endpoint::Unconfigured),
            Some(s) if s == placeholder.trim() => return Ok(Endpoint::Unconfigured),
            Some(s) => s,
        };

        let url = Url::parse(raw).map_err(|e| ConfigError::ValidationError {
            field: "submission.endpoint".into(),
            message: format!("not a valid URL ({e}): {raw}"),
        })?;

        match url.scheme() {
            "http" | "https" => Ok(Endpoint::Configured(url)),
            other => Err(ConfigError::ValidationError {
                field: "submission.endpoint".into(),
                message: format!("unsupported scheme `{other}`, expected http or https"),
            }),
        }
    }

    pub fn is_configured(&self) -> bool {
        matches!(self, Endpoint::Configured(_))
    }
}

// ---------------------------------------------------------------------------
// [submission] section
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct SubmissionSection {
    #[serde(default)]
    endpoint: Option<String>,
    #[serde(default = "default_placeholder")]
    placeholder: String,
    #[serde(default = "default_submit_timeout_secs")]
    timeout_secs: u64,
    #[serde(default)]
    labels: FieldLabels,
}

/// Display labels for the two form fields.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldLabels {
    pub resource_name: String,
    pub requester_email: String,
}

impl Default for FieldLabels {
    fn default() -> Self {
        FieldLabels {
            resource_name: "Instance name".to_string(),
            requester_email: "Requester email".to_string(),
        }
    }
}

/// Everything the submission controller needs, injected at construction.
#[derive(Debug, Clone)]
pub struct SubmissionConfig {
    pub endpoint: Endpoint,
    pub placeholder: String,
    pub labels: FieldLabels,
    /// Deadline for the single outbound request.
    pub timeout: Duration,
}

impl SubmissionConfig {
    /// Config with default labels and timeout for the given endpoint.
    pub fn with_endpoint(endpoint: Endpoint) -> Self {
        SubmissionConfig {
            endpoint,
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            labels: FieldLabels::default(),
            timeout: DEFAULT_SUBMIT_TIMEOUT,
        }
    }
}

// ---------------------------------------------------------------------------
// [estimate] section
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct EstimateSection {
    source_currency: String,
    target_currency: String,
    fallback_rate: f64,
    #[serde(default = "default_rate_timeout_secs")]
    rate_timeout_secs: u64,
    #[serde(default)]
    rate_sources: Vec<RateSourceConfig>,
}

/// One external exchange-rate source, tried in file order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RateSourceConfig {
    pub name: String,
    pub url: String,
    /// Dotted path to the numeric rate in the JSON response, e.g. `rates.JPY`.
    pub rate_path: String,
}

#[derive(Debug, Clone)]
pub struct EstimateConfig {
    pub source_currency: String,
    pub target_currency: String,
    pub fallback_rate: f64,
    /// Deadline applied to each rate-source attempt individually.
    pub rate_timeout: Duration,
    pub rate_sources: Vec<RateSourceConfig>,
}

impl Default for EstimateConfig {
    fn default() -> Self {
        EstimateConfig {
            source_currency: "USD".to_string(),
            target_currency: "JPY".to_string(),
            fallback_rate: DEFAULT_FALLBACK_RATE,
            rate_timeout: DEFAULT_RATE_TIMEOUT,
            rate_sources: vec![
                RateSourceConfig {
                    name: "frankfurter".to_string(),
                    url: "https://api.frankfurter.app/latest?from=USD&to=JPY".to_string(),
                    rate_path: "rates.JPY".to_string(),
                },
                RateSourceConfig {
                    name: "open-er-api".to_string(),
                    url: "https://open.er-api.com/v6/latest/USD".to_string(),
                    rate_path: "rates.JPY".to_string(),
                },
            ],
        }
    }
}

/// Raw deserialization target for the whole provdesk.toml file.
#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    submission: SubmissionSection,
    estimate: EstimateSection,
}

fn default_placeholder() -> String {
    DEFAULT_PLACEHOLDER.to_string()
}

fn default_submit_timeout_secs() -> u64 {
    DEFAULT_SUBMIT_TIMEOUT.as_secs()
}

fn default_rate_timeout_secs() -> u64 {
    DEFAULT_RATE_TIMEOUT.as_secs()
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/provdesk.toml` relative to `base_dir`.
///
/// `endpoint_override` takes precedence over `submission.endpoint` from the
/// file unless it is blank; `load_config()` feeds it from the
/// `PROVDESK_ENDPOINT` variable. This primitive does not auto-copy defaults.
pub fn load_config_from(
    base_dir: &Path,
    endpoint_override: Option<String>,
) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE_NAME);
    let text = read_file(&path)?;
    let file: ConfigFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    validate(&file)?;

    let raw_endpoint = endpoint_override
        .filter(|v| !v.trim().is_empty())
        .or(file.submission.endpoint);
    let endpoint = Endpoint::resolve(raw_endpoint.as_deref(), &file.submission.placeholder)?;

    let submission = SubmissionConfig {
        endpoint,
        placeholder: file.submission.placeholder,
        labels: file.submission.labels,
        timeout: Duration::from_secs(file.submission.timeout_secs),
    };

    let estimate = EstimateConfig {
        source_currency: file.estimate.source_currency,
        target_currency: file.estimate.target_currency,
        fallback_rate: file.estimate.fallback_rate,
        rate_timeout: Duration::from_secs(file.estimate.rate_timeout_secs),
        rate_sources: file.estimate.rate_sources,
    };

    Ok(Config {
        submission,
        estimate,
    })
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    let mut copied = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }

        let target = config_dir.join(file_name);
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working
/// directory, seeding `config/` from `defaults/` first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    let endpoint_override = std::env::var(ENDPOINT_ENV_VAR).ok();
    load_config_from(&cwd, endpoint_override)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(file: &ConfigFile) -> Result<(), ConfigError> {
    if file.submission.timeout_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "submission.timeout_secs".into(),
            message: "must be greater than 0".into(),
        });
    }

    let est = &file.estimate;
    if est.rate_timeout_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "estimate.rate_timeout_secs".into(),
            message: "must be greater than 0".into(),
        });
    }

    if !(est.fallback_rate.is_finite() && est.fallback_rate > 0.0) {
        return Err(ConfigError::ValidationError {
            field: "estimate.fallback_rate".into(),
            message: format!("must be > 0, got {}", est.fallback_rate),
        });
    }

    let currencies: &[(&str, &str)] = &[
        ("estimate.source_currency", est.source_currency.as_str()),
        ("estimate.target_currency", est.target_currency.as_str()),
    ];
    for (name, val) in currencies {
        if val.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must not be empty".into(),
            });
        }
    }

    for (i, source) in est.rate_sources.iter().enumerate() {
        if Url::parse(&source.url).is_err() {
            return Err(ConfigError::ValidationError {
                field: format!("estimate.rate_sources[{i}].url"),
                message: format!("not a valid URL: {}", source.url),
            });
        }
        if source.rate_path.split('.').any(str::is_empty) {
            return Err(ConfigError::ValidationError {
                field: format!("estimate.rate_sources[{i}].rate_path"),
                message: format!("malformed path `{}`", source.rate_path),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
