use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hospital_api::config::ServerConfig;
use hospital_api::router::build_app_router;
use hospital_api::state::AppState;
use hospital_directory::DirectoryApi;
use hospital_events::{EventBus, EventLogger};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "hospital_api=debug,hospital_pipeline=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        directory = %config.directory.base_url,
        max_csv_rows = config.max_csv_rows,
        "Loaded server configuration",
    );

    // --- Directory client ---
    let directory =
        Arc::new(DirectoryApi::new(&config.directory).expect("Failed to build directory client"));

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());
    let logger_handle = tokio::spawn(EventLogger::run(event_bus.subscribe()));
    tracing::info!("Event bus created");

    // --- App state ---
    let state = AppState::new(config.clone(), directory, Arc::clone(&event_bus));
    let runner = Arc::clone(&state.runner);

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!(
        in_flight = runner.in_flight(),
        "Server stopped accepting connections, draining batch passes"
    );

    if runner.shutdown(config.shutdown_timeout()).await {
        tracing::info!("Batch passes drained");
    } else {
        tracing::warn!(
            in_flight = runner.in_flight(),
            "Shutdown timeout elapsed with batch passes still running"
        );
    }

    // Dropping the last sender closes the channel and stops the logger.
    drop(runner);
    drop(event_bus);
    match tokio::time::timeout(Duration::from_secs(5), logger_handle).await {
        Ok(Ok(count)) => tracing::info!(count, "Event logger stopped"),
        _ => tracing::warn!("Event logger did not stop cleanly"),
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT (Ctrl-C) or SIGTERM on Unix to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
