//! Credential Gateway
//!
//! Single-binary service that:
//! 1. Loads the credential pool from a Google Sheet (or canned demo rows)
//! 2. Issues credentials over HTTP and chatbot webhooks
//! 3. Optionally texts issued credentials through Twilio
//! 4. Exposes pool health, statistics and Prometheus metrics

mod api;
mod config;
mod metrics;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use credential_pool::{Issuer, PoolManager};
use notifier::{DisabledNotifier, Notifier, TwilioNotifier};
use pool_store::{MemoryStore, SheetsStore, StoreAdapter};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::AppState;
use crate::config::Config;

/// Time allowed for in-flight requests to finish after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting credential-gateway");

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus_handle =
        metrics::install_recorder().context("failed to install Prometheus recorder")?;

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let layout = config
        .pool
        .sheet_layout()
        .context("invalid pool layout")?;
    let store_timeout = Duration::from_secs(config.pool.store_timeout_secs);
    let http_client = reqwest::Client::new();

    let store = build_store(&config, http_client.clone(), store_timeout);
    let notifier = build_notifier(&config, http_client, store_timeout);

    info!(
        listen_addr = %config.server.listen_addr,
        store = store.id(),
        notifier = notifier.id(),
        slots = layout.slot_count(),
        status_column = layout.status_column(),
        "configuration loaded"
    );

    let pool = Arc::new(PoolManager::new(store, layout, store_timeout).await);
    let issuer = Issuer::new(pool, notifier).with_template(config.pool.message_template.clone());

    let app = api::build_router(
        AppState::new(Arc::new(issuer), prometheus_handle),
        config.server.max_connections,
    );

    let listen_addr = config.server.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;
    info!(addr = %listen_addr, "accepting requests");

    // The drain timeout starts when the shutdown signal fires, not when the
    // server starts: signal the server to drain, then race it against the timer.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Ok(()))) => {
            info!("all in-flight requests drained");
        }
        Ok(Ok(Err(e))) => {
            error!(error = %e, "server error during shutdown");
        }
        Ok(Err(e)) => {
            error!(error = %e, "server task panicked");
        }
        Err(_) => {
            warn!(
                drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
                "drain timeout exceeded, forcing shutdown"
            );
        }
    }

    info!("shutdown complete");
    Ok(())
}

/// Live Sheets store when configured with a token, demo rows otherwise.
fn build_store(
    config: &Config,
    client: reqwest::Client,
    timeout: Duration,
) -> Arc<dyn StoreAdapter> {
    match config.live_sheets() {
        Some((sheets, token)) => {
            info!(
                spreadsheet_id = %sheets.spreadsheet_id,
                sheet = %sheets.sheet_name,
                "using Google Sheets store"
            );
            Arc::new(SheetsStore::new(
                client,
                sheets.api_base.clone(),
                sheets.spreadsheet_id.clone(),
                sheets.sheet_name.clone(),
                token.clone(),
                timeout,
            ))
        }
        None => {
            if config.demo {
                info!("demo mode enabled, serving canned rows");
            } else {
                warn!("no Sheets access configured, falling back to demo rows");
            }
            Arc::new(MemoryStore::demo())
        }
    }
}

/// Twilio when fully configured, otherwise a notifier that never sends.
fn build_notifier(
    config: &Config,
    client: reqwest::Client,
    timeout: Duration,
) -> Arc<dyn Notifier> {
    let Some(twilio) = config.twilio.as_ref() else {
        return Arc::new(DisabledNotifier);
    };
    let Some(token) = twilio.auth_token.as_ref() else {
        warn!("twilio configured without an auth token, SMS delivery disabled");
        return Arc::new(DisabledNotifier);
    };
    Arc::new(TwilioNotifier::new(
        client,
        twilio.api_base.clone(),
        twilio.account_sid.clone(),
        token.clone(),
        twilio.from_number.clone(),
        timeout,
    ))
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
