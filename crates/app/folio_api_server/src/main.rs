//! Folio API server binary.
//!
//! Serves the HTTP API over PostgreSQL when a database URL is configured,
//! otherwise over in-memory stores.

use clap::Parser;
use folio_api::AppState;
use folio_api::config::ApiConfig;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "folio_api_server", about = "Folio API server")]
struct Args {
    /// Port to listen on, replacing the port of `BIND_ADDR` (0 = ephemeral).
    #[arg(long)]
    port: Option<u16>,

    /// PostgreSQL connection URL. Without one, data lives in memory only.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,folio_api=debug,folio_core=debug")
            }),
        )
        .init();

    let args = Args::parse();

    let mut config = ApiConfig::from_env();
    if let Some(port) = args.port {
        config.bind_addr = with_port(&config.bind_addr, port);
    }
    config.database_url = args.database_url.filter(|url| !url.trim().is_empty());

    info!(config = ?config, "starting folio_api_server");

    let state = match &config.database_url {
        Some(url) => {
            info!(max_connections = args.max_connections, "configuring connection pool");
            let pool = PgPoolOptions::new()
                .max_connections(args.max_connections)
                .acquire_timeout(std::time::Duration::from_secs(30))
                .connect(url)
                .await?;

            info!("running database migrations");
            folio_api::migrate(&pool).await?;
            AppState::postgres(config.clone(), pool)?
        }
        None => {
            warn!("DATABASE_URL not set; using in-memory stores");
            AppState::in_memory(config.clone())?
        }
    };

    let app = folio_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

/// Resolves on Ctrl-C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

/// Replace the port of a `host:port` address.
fn with_port(bind_addr: &str, port: u16) -> String {
    let host = bind_addr
        .rsplit_once(':')
        .map_or(bind_addr, |(host, _)| host);
    format!("{host}:{port}")
}
