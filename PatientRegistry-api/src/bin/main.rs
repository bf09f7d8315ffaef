use std::net::SocketAddr;

use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use patient_registry_api::api::{create_app, AppState};
use patient_registry_domain::config::{AppConfig, LogFormat};

/// Name attached to lifecycle log events
const SERVICE_NAME: &str = "patient-registry";

/// The main entry point for the patient registry gateway
///
/// Loads `.env` and the configuration, sets up tracing, then serves the
/// auth, patient and search routers on one port until Ctrl+C or SIGTERM.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    let dotenv_missing = dotenv().is_err();

    let config = AppConfig::from_env().context("invalid configuration")?;
    init_tracing(config.log_format);

    if dotenv_missing {
        warn!(".env file not found or couldn't be read, using process environment");
    }

    info!(
        service = SERVICE_NAME,
        environment = %config.app_env,
        require_auth = config.require_auth,
        "Starting patient registry API"
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = create_app(AppState::new(config));

    // Create a TCP listener and bind to the address
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(service = SERVICE_NAME, "Listening on {}", addr);

    // Serve the application with graceful shutdown support
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!(service = SERVICE_NAME, "Server shutdown complete");
    Ok(())
}

/// Install the global subscriber: env filter plus a pretty or JSON fmt layer
fn init_tracing(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (pretty, json) = match format {
        LogFormat::Pretty => (
            Some(
                fmt::layer()
                    .with_span_events(FmtSpan::CLOSE)
                    .with_target(false)
                    .with_ansi(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stdout),
            ),
            None,
        ),
        LogFormat::Json => (
            None,
            Some(
                fmt::layer()
                    .json()
                    .with_span_events(FmtSpan::CLOSE)
                    .with_current_span(false)
                    .with_writer(std::io::stdout),
            ),
        ),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(pretty)
        .with(json)
        .init();
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!(service = SERVICE_NAME, "Shutting down server...");
}
