//! Project tracker backend: clients, projects, tasks, users and time logs over
//! a JSON API, with a realtime WebSocket channel for change notifications.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod realtime;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
};
use tokio::net::TcpListener;
use tokio::signal::{self, ctrl_c};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

pub use config::Config;
pub use db::{Database, MemoryStore, Store};
pub use routes::AppState;

/// The full application router with tracing and CORS layers applied.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    routes::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Bind to the configured address and serve until Ctrl+C or SIGTERM.
pub async fn start_server(config: &Config, store: Arc<dyn Store>) -> Result<()> {
    let state = AppState::new(store, config);
    let app = app(state);

    let address = config.bind_address();
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
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
}
