//! Koksmat Emit Server - Main Entry Point
//!
//! Receives provider webhooks and relays them to the automation bus.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::{error, info};

use emit_server::{
    api, config,
    bus::{BusClient, BusObserver, NatsBus},
    observability::{self, BusEventLogger, HealthFlag, Metrics},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env()?;

    // Initialize tracing
    observability::tracing::init(&config.log)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        service = %config.service_name,
        "Starting Koksmat Emit"
    );
    if config.github_pat.is_some() {
        info!("GITHUB_PAT configured");
    }

    let metrics = Metrics::new(&config.service_name).context("failed to register metrics")?;
    let health = HealthFlag::default();

    // Connect to the bus; unreachable at startup is fatal
    let observer: Arc<dyn BusObserver> =
        Arc::new(BusEventLogger::new(metrics.clone(), health.clone()));
    let bus: Arc<dyn BusClient> = Arc::new(
        NatsBus::connect(&config.nats, vec![observer])
            .await
            .with_context(|| format!("failed to connect to bus at {}", config.nats.url))?,
    );

    let bind_address = config.bind_address.clone();
    let metrics_address = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));

    // Build application state and router
    let state = api::AppState::new(config, Arc::clone(&bus), metrics.clone(), health)?;
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!(address = %bind_address, "Server listening");
    let metrics_listener = tokio::net::TcpListener::bind(metrics_address).await?;
    info!(address = %metrics_address, "Metrics listening");

    // Graceful shutdown handler
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Received shutdown signal, draining requests...");
        let _ = shutdown_tx.send(true);
    });

    let metrics_server = {
        let shutdown = wait_for_shutdown(shutdown_rx.clone());
        tokio::spawn(async move {
            axum::serve(metrics_listener, observability::metrics_router::<()>(metrics))
                .with_graceful_shutdown(shutdown)
                .await
        })
    };

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(wait_for_shutdown(shutdown_rx))
    .await?;

    match metrics_server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "Metrics server failed"),
        Err(e) => error!(error = %e, "Metrics server task panicked"),
    }

    bus.close().await;
    info!("Server shutdown complete");

    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for CTRL+C");
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
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}
