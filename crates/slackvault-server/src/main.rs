mod format;
mod routes;
mod templates;
mod views;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use slackvault_db::{Database, db_path};

use crate::routes::AppStateInner;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "slackvault_server=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let data_dir = PathBuf::from(
        std::env::var("SLACKVAULT_DATA_DIR").unwrap_or_else(|_| "data".into()),
    );
    let channel = std::env::var("SLACKVAULT_CHANNEL").unwrap_or_else(|_| "general".into());
    let host = std::env::var("SLACKVAULT_HOST").unwrap_or_else(|_| "127.0.0.1".into());
    let port: u16 = std::env::var("SLACKVAULT_PORT")
        .unwrap_or_else(|_| "5000".into())
        .parse()?;

    // The archiver owns the schema; the UI only reads.
    let db_file = db_path(&data_dir);
    if !db_file.exists() {
        anyhow::bail!(
            "no archive at {}; run slackvault-archive first",
            db_file.display()
        );
    }
    let db = Database::open_read_only(&db_file)?;

    let state = Arc::new(AppStateInner {
        db,
        default_channel: channel,
        data_dir,
    });
    let app = routes::router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("slackvault UI listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
