// provdesk entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config (seeding config/ from defaults/, PROVDESK_ENDPOINT override)
// 3. Build the submission controller and the estimate aggregator
// 4. Create mpsc channels
// 5. Spawn app logic task
// 6. Run the TUI until the user quits
// 7. Cleanup on exit

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use provdesk_core::config::{self, Endpoint};
use provdesk_core::estimate::EstimateAggregator;
use provdesk_core::submission::{HttpTransport, SubmissionController};
use provdesk_tui::{app, tui};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;
    info!("provdesk starting up");

    let config = config::load_config().context("failed to load configuration")?;
    match &config.submission.endpoint {
        Endpoint::Configured(url) => info!(
            "Submission endpoint: {}",
            url.host_str().unwrap_or("<no host>")
        ),
        Endpoint::Unconfigured => warn!(
            "Submission endpoint not configured; set {} or edit config/{}",
            config::ENDPOINT_ENV_VAR,
            config::CONFIG_FILE_NAME
        ),
    }
    info!(
        "Estimates convert {} -> {} using {} rate source(s), fallback {}",
        config.estimate.source_currency,
        config.estimate.target_currency,
        config.estimate.rate_sources.len(),
        config.estimate.fallback_rate
    );

    let controller =
        SubmissionController::new(config.submission.clone(), Arc::new(HttpTransport::new()));
    let aggregator = EstimateAggregator::from_config(&config.estimate);

    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (ui_tx, ui_rx) = mpsc::channel(256);
    let (task_tx, task_rx) = mpsc::channel(16);

    let state = app::AppState::new(controller, aggregator, task_tx);

    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(cmd_rx, task_rx, ui_tx, state).await {
            error!("Application loop error: {}", e);
        }
    });

    // Blocks until the user presses 'q' or Ctrl+C.
    if let Err(e) = tui::run(ui_rx, cmd_tx).await {
        error!("TUI error: {}", e);
    }

    // In-flight network tasks are abandoned; the app loop exits on Quit.
    let _ = tokio::time::timeout(Duration::from_secs(5), async {
        let _ = app_handle.await;
    })
    .await;

    info!("provdesk shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to a file (not the terminal, which is used by the TUI).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("provdesk.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("provdesk=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
