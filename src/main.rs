use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use prendas_api::config::{AppConfig, StorageBackend, load_config};
use prendas_api::core::error::AppError;
use prendas_api::features::prendas::{
    ConnectionProvider, MongoConnectionProvider, SledConnectionProvider,
};
use prendas_api::server::{AppState, build_router};

const SLED_TREE: &str = "prendas";

#[tokio::main]
async fn main() -> Result<(), AppError> {
    init_tracing();

    let config = load_config()?;
    let state = AppState::new(build_provider(&config)?);
    tracing::info!(backend = state.service.backend_name(), "storage backend selected");

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|err| AppError::internal(format!("failed to bind: {err}")))?;
    tracing::info!(%addr, "Servidor escuchando en puerto {}", config.port);
    axum::serve(listener, app)
        .await
        .map_err(|err| AppError::internal(format!("server error: {err}")))?;

    Ok(())
}

fn build_provider(config: &AppConfig) -> Result<Arc<dyn ConnectionProvider>, AppError> {
    match config.backend {
        StorageBackend::MongoDb => Ok(Arc::new(MongoConnectionProvider::new(config.mongo.clone()))),
        StorageBackend::Sled => {
            let db = sled::open(&config.db_path).map_err(|err| {
                AppError::internal(format!(
                    "failed to open sled database at {}: {err}",
                    config.db_path
                ))
            })?;
            Ok(Arc::new(SledConnectionProvider::new(db, SLED_TREE)))
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}
