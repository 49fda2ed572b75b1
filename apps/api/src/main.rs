//! # Moinho API Server
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Browser ───► HTTP/SSE (8080) ───► routes ───► SQLite (moinho.db)       │
//! │                                       │                                 │
//! │                                       ▼                                 │
//! │                          Mercado Pago • ViaCEP                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use chrono::Utc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use moinho_api::{router, AppConfig, AppState};
use moinho_db::{Database, DbConfig};

/// How often expired token revocations are purged.
const PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config);

    info!("Starting Moinho API server...");
    info!(
        addr = %config.bind_addr(),
        database = %config.database.path,
        "Configuration loaded"
    );

    let db = Database::new(
        DbConfig::new(&config.database.path).max_connections(config.database.max_connections),
    )
    .await?;
    info!("Database ready");

    spawn_revocation_purge(db.clone());

    let addr = config.bind_addr();
    let state = AppState::new(db.clone(), config)?;
    let app = router(state);

    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "Starting HTTP server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// `RUST_LOG` wins over `log.filter`.
fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    if config.log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn spawn_revocation_purge(db: Database) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            match db.users().purge_expired_revocations(Utc::now()).await {
                Ok(0) => {}
                Ok(purged) => info!(purged, "Purged expired token revocations"),
                Err(e) => warn!(error = %e, "Failed to purge token revocations"),
            }
        }
    });
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
