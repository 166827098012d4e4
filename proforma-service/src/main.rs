//! Proforma Service entry point.

use proforma_service::config::ProformaConfig;
use proforma_service::startup::Application;
use service_core::observability::init_tracing;
use std::process::ExitCode;
use tokio::signal;

/// Resolves on Ctrl+C or SIGTERM. A handler that cannot be installed only
/// disables its own branch.
async fn stop_requested() {
    let interrupt = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => {},
        _ = terminate => {},
    }

    tracing::info!("Stop requested; draining in-flight requests");
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match ProformaConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("proforma-service: invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    );

    tracing::info!(
        version = %config.service_version,
        port = config.common.port,
        backend = ?config.backend,
        store_timeout_ms = config.store.timeout_ms,
        store_read_retries = config.store.read_retries,
        draft_idle_ttl_secs = config.drafts.idle_ttl_secs,
        otlp = config.otlp_endpoint.is_some(),
        "Starting proforma-service"
    );

    let app = match Application::build(config).await {
        Ok(app) => app,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = app.run_until_stopped(stop_requested()).await {
        tracing::error!(error = %e, "Server stopped with an error");
        return ExitCode::FAILURE;
    }

    tracing::info!("proforma-service stopped");
    ExitCode::SUCCESS
}
