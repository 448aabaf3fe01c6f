//! notekeep server
//!
//! REST backend for JWT-authenticated, per-user notes.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use notekeep_core::config::{default_database_path, load_config};
use notekeep_core::tracing_init::{LogFormat, init_tracing};

use notekeep_server::auth::JwtManager;
use notekeep_server::cache::create_cache_backend;
use notekeep_server::http::{AppState, build_router};
use notekeep_server::service::{NoteService, TokenService, UserService};
use notekeep_server::storage::Database;

#[derive(Parser, Debug)]
#[command(name = "notekeep-server")]
#[command(version, about = "notekeep server - JWT auth and per-user notes over HTTP")]
struct Args {
    /// Path to a JSON config file.
    #[arg(long, env = "NOTEKEEP_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on. Overrides `SERVER_ADDR` and `SERVER_PORT`.
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Path to SQLite database file.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Loaded before the config so `.env` values act as environment variables.
    let dotenv = dotenvy::dotenv();

    let mut config = load_config(args.config.as_deref())?;
    if let Some(addr) = args.addr {
        config.server.addr = addr.ip().to_string();
        config.server.port = addr.port();
    }
    if let Some(path) = args.db_path {
        config.database.path = Some(path);
    }
    config.validate()?;

    init_tracing(
        "notekeep_server=info,tower_http=info",
        LogFormat::resolve(args.log_json, &config.server.mode),
    );

    match dotenv {
        Ok(path) => info!(path = %path.display(), "Loaded .env file"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(error = %e, "Failed to load .env file"),
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.listen_addr(),
        mode = %config.server.mode,
        "Starting notekeep-server"
    );

    let db_path = config
        .database
        .path
        .clone()
        .or_else(default_database_path)
        .context("Cannot determine database path, set DATABASE_PATH or --db-path")?;
    let db = Database::open(&db_path).await?;

    let jwt = Arc::new(JwtManager::new(
        config.jwt.secret.as_bytes(),
        config.jwt.access_ttl_secs(),
        config.jwt.refresh_ttl_secs(),
    ));
    let cache = create_cache_backend(&config.cache).await;

    let state = AppState {
        tokens: TokenService::new(db.clone(), jwt),
        users: UserService::new(db.clone()),
        notes: NoteService::new(db, cache, Duration::from_secs(config.cache.note_ttl_secs)),
    };

    let listener = tokio::net::TcpListener::bind(config.listen_addr())
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr()))?;
    info!(addr = %config.listen_addr(), "Listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
