use clap::Parser;
use tracing_subscriber::EnvFilter;

use linket_api::config::{AppConfig, StorageBackend};
use linket_api::database::manager::DatabaseManager;
use linket_api::database::Store;
use linket_api::{app, AppState};

#[derive(Debug, Parser)]
#[command(name = "linket-api", version, about = "Linket card service HTTP API")]
struct Args {
    /// Port to listen on (overrides API_PORT / PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Storage backend: postgres or memory (overrides STORAGE_BACKEND)
    #[arg(long)]
    backend: Option<StorageBackend>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, STORAGE_BACKEND, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config: AppConfig = linket_api::config::config().clone();
    if let Some(port) = args.port {
        config.api.port = port;
    }
    if let Some(backend) = args.backend {
        config.database.backend = backend;
    }
    tracing::info!(
        "Starting Linket API in {:?} mode with {} storage",
        config.environment,
        config.database.backend
    );

    if config.security.jwt_secret.is_none() {
        if linket_api::is_production!() {
            anyhow::bail!("SECURITY_JWT_SECRET must be set in production");
        }
        tracing::warn!("SECURITY_JWT_SECRET is not set; owner routes trust the accountId they are given");
    }

    let store = match config.database.backend {
        StorageBackend::Postgres => {
            let pool = DatabaseManager::main_pool(&config.database).await?;
            DatabaseManager::migrate(&pool).await?;
            Store::postgres(pool)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Store::memory()
        }
    };

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let app = app(AppState::new(config, store));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Linket API listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
