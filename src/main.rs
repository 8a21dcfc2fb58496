//! imputeflow - console client for a remote spreadsheet imputation service
//!
//! # Overview
//!
//! This binary wires the library together and hands the terminal to the
//! interactive [`ConsoleController`]. It initializes:
//! - Configuration ([`ConfigManager`], `imputeflow/client.yaml`)
//! - Logging infrastructure (file rotation + optional console output)
//! - A single-threaded tokio runtime
//! - The HTTP transport ([`HttpImputationClient`]) and a background health probe
//!
//! # Execution Flow
//!
//! 1. Load `imputeflow/client.yaml` (defaults when missing, `IMPUTEFLOW_SERVICE_URL` wins)
//! 2. Initialize logging -> `<log_dir>/imputeflow.<date>`
//! 3. Create the current-thread tokio runtime
//! 4. Resolve the service address once and build the HTTP client
//! 5. Spawn the health probe (logs only)
//! 6. Read commands from stdin until `quit` or end of input
//! 7. Log the session summary

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use imputeflow::services::spawn_probe;
use imputeflow::ui::ConsoleController;
use imputeflow::{
    APP_NAME, ConfigManager, HttpImputationClient, ProcessingWorkflow, ServiceEndpoint,
    SessionMetrics, VERSION,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;

fn main() -> Result<()> {
    let config_manager = ConfigManager::new("imputeflow")?;
    let config = config_manager.load_config()?;

    // Hold the guard so buffered log lines are flushed on exit
    let _log_guard = imputeflow::logging::setup_logging(&config.logging)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    let endpoint = ServiceEndpoint::parse(&config.service.base_url)
        .with_context(|| format!("Invalid service address: {}", config.service.base_url))?;

    let client = HttpImputationClient::new(
        endpoint,
        Duration::from_secs(config.service.request_timeout_secs),
        Duration::from_secs(config.service.connect_timeout_secs),
    )
    .context("Failed to build HTTP client")?;
    tracing::info!("Using imputation service at {}", client.endpoint().base());

    let params = config
        .defaults
        .to_request_parameters()
        .context("Invalid default parameters in client config")?;

    let metrics = Arc::new(SessionMetrics::new());

    let result = runtime.block_on(async {
        // Fire-and-forget; the probe only logs
        let _probe = spawn_probe(client.clone());

        let mut controller = ConsoleController::new(
            ProcessingWorkflow::new(params),
            client,
            Utf8PathBuf::from(&config.download_dir),
            metrics.clone(),
        );

        let stdin = BufReader::new(tokio::io::stdin());
        let mut stdout = tokio::io::stdout();
        controller.run(stdin, &mut stdout).await
    });

    metrics.log_summary();

    if let Err(e) = &result {
        tracing::error!("Console error: {:#}", e);
    }

    tracing::info!("Application shutdown complete");
    result
}
