use std::sync::Arc;

use anyhow::Context;
use tokio::signal;

use foundation_api::app::{router, AppState};
use foundation_api::database::{PgConnector, PgUserStore};
use foundation_api::services::ensure_admin_logged;
use foundation_api::{config, is_development, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();
    logging::init();

    let config = config::config().clone();
    tracing::info!("Starting Foundation API in {:?} mode", config.environment);
    if is_development!() && std::env::var("JWT_SECRET").is_err() {
        tracing::warn!("JWT_SECRET not set, using the development secret");
    }

    let db = Arc::new(PgConnector::provider(config.database.clone()));
    let users = PgUserStore::new(db.clone());

    // The API is useless without storage, so an unreachable database at boot is fatal
    db.acquire().await.context("failed to connect to database")?;
    users.ensure_schema().await.context("failed to prepare users table")?;
    ensure_admin_logged(&users, &config.admin).await;

    let port = config.api.port;
    let state = AppState::new(config, db.clone(), Arc::new(users)).context("invalid security configuration")?;
    let app = router(state);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Foundation API listening on http://{}/api", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    db.close().await;
    tracing::info!("Process terminated");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("SIGINT received, shutting down gracefully"),
        _ = terminate => tracing::info!("SIGTERM received, shutting down gracefully"),
    }
}
