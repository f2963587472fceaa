//! Free throw telemetry server: session REST API, telemetry WebSocket and archive wiring.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod dao;
mod dto;
mod error;
mod routes;
mod services;
mod state;

use config::{AppConfig, ArchiveBackend};
use dao::archive::{ArchiveStore, MemoryArchive};
use state::{AppState, SharedState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let port = config.port();
    let archive = connect_archive(config.backend()).await?;

    // The root folder must exist before any session can be archived.
    let app_state = AppState::bootstrap(&config, archive)
        .await
        .context("preparing archive root folder")?;
    let app = build_router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Open the archive backend selected by the configuration.
async fn connect_archive(backend: ArchiveBackend) -> anyhow::Result<Arc<dyn ArchiveStore>> {
    match backend {
        #[cfg(feature = "drive-store")]
        ArchiveBackend::Drive => {
            use dao::archive::drive::{DriveArchive, DriveConfig};

            let store = DriveArchive::connect(DriveConfig::from_env())
                .await
                .context("connecting to Google Drive")?;
            info!("using Google Drive archive");
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "drive-store"))]
        ArchiveBackend::Drive => {
            tracing::warn!("built without `drive-store`; falling back to the in-memory archive");
            Ok(Arc::new(MemoryArchive::new()))
        }
        ArchiveBackend::Memory => {
            info!("using in-memory archive; uploads are lost on exit");
            Ok(Arc::new(MemoryArchive::new()))
        }
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let Ok(mut term) = signal(SignalKind::terminate()) else {
            let _ = tokio::signal::ctrl_c().await;
            return;
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
