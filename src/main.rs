use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use innoserver::config::AppConfig;
use innoserver::database::DatabaseManager;
use innoserver::routes;
use innoserver::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "innoserver", version, about = "Posts, groups and memberships over HTTP")]
struct Args {
    /// JSON file layered over the run level defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Apply database migrations before serving
    #[arg(long)]
    migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up JWT_SECRET, DATABASE_URL, etc.
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let config = AppConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    init_tracing(&config);
    tracing::info!("Starting innoserver in {:?} mode", config.run_level);

    let pool = DatabaseManager::connect(&config).await?;
    if args.migrate {
        DatabaseManager::migrate(&pool).await?;
    }

    let bind_addr = config.bind_address();
    let app = routes::app(AppState::from_pool(config, pool));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("innoserver listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let default = if config.is_debug() {
        "innoserver=debug,tower_http=debug"
    } else {
        "innoserver=info,tower_http=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
