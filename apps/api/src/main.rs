mod config;
mod db;
mod errors;
mod models;
mod reconcile;
mod routes;
mod state;
mod users;
mod webhook;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, StoreBackend};
use crate::db::{create_pool, ensure_schema};
use crate::reconcile::Reconciler;
use crate::routes::{build_router, cors_layer};
use crate::state::AppState;
use crate::users::memory::InMemoryUserStore;
use crate::users::postgres::PgUserStore;
use crate::users::store::UserStore;
use crate::webhook::verifier::WebhookVerifier;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Registry API v{}", env!("CARGO_PKG_VERSION"));

    // Open the user store; it is closed again after the server drains.
    let store = open_store(&config).await?;

    let state = AppState {
        reconciler: Reconciler::new(
            Arc::clone(&store),
            WebhookVerifier::new(config.webhook_secret.clone()),
        ),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.allowed_origins)?);
    info!("CORS allowed origins: {:?}", config.allowed_origins);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    info!("Shutdown complete");
    Ok(())
}

async fn open_store(config: &Config) -> Result<Arc<dyn UserStore>> {
    match (config.store_backend, config.database_url.as_deref()) {
        (StoreBackend::Postgres, Some(url)) => {
            let pool = create_pool(url, config.database_max_connections).await?;
            ensure_schema(&pool).await?;
            Ok(Arc::new(PgUserStore::new(pool)))
        }
        (StoreBackend::Postgres, None) => {
            anyhow::bail!("Required environment variable 'DATABASE_URL' is not set")
        }
        (StoreBackend::Memory, _) => {
            tracing::warn!("Using in-memory user store; data is lost on restart");
            Ok(Arc::new(InMemoryUserStore::new()))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
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
                tracing::error!("Failed to listen for SIGTERM: {e}");
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

    info!("Shutdown signal received, draining connections...");
}
