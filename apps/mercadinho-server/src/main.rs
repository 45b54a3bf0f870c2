//! # Mercadinho Server
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Server Startup                                    │
//! │                                                                         │
//! │  1. Initialize Logging ── RUST_LOG or info,mercadinho=debug,sqlx=warn   │
//! │                                                                         │
//! │  2. Load Config ───────── defaults < mercadinho.toml < MERCADINHO_* env │
//! │     (path may be given as the first argument)                           │
//! │                                                                         │
//! │  3. Connect to Database ─ SQLite WAL, pending migrations                │
//! │                                                                         │
//! │  4. Build State ───────── Mercado Pago client, stored credentials,      │
//! │                           PIX/card workflows, checkout session          │
//! │                                                                         │
//! │  5. Serve ─────────────── until ctrl-c, then close the pool             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use mercadinho_db::{Database, DbConfig, DbError};
use mercadinho_payments::{MercadoPagoClient, PaymentError, PaymentsConfig};
use mercadinho_server::{init_tracing, router, AppState};
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] PaymentError),

    #[error("database: {0}")]
    Database(#[from] DbError),

    #[error("server: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(e) = run().await {
        error!(error = %e, "Server stopped with an error");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = PaymentsConfig::load(config_path)?;
    info!(
        database = %config.database_path.display(),
        bind = %config.bind_addr,
        provider = %config.provider.base_url,
        "Starting Mercadinho server"
    );

    if let Some(dir) = config.database_path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    let db = Database::new(DbConfig::new(&config.database_path)).await?;

    let provider = MercadoPagoClient::new(&config.provider)?;
    let state = AppState::build(db.clone(), &config, provider).await?;

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "Listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, starting graceful shutdown");
}
