use std::env;

use crate::config::dto::{AppConfig, MongoConfig, StorageBackend};
use crate::core::error::AppError;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MONGODB_URI: &str = "mongodb://localhost:27017";
const DEFAULT_DATABASE: &str = "prendas";
const DEFAULT_COLLECTION: &str = "prendas";
const DEFAULT_DB_PATH: &str = "data/prendas";

pub fn load_config() -> Result<AppConfig, AppError> {
    dotenvy::dotenv().ok();
    config_from_lookup(|key| env::var(key).ok())
}

pub fn config_from_lookup<F>(lookup: F) -> Result<AppConfig, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    let port = match lookup("PORT") {
        Some(value) => value
            .trim()
            .parse::<u16>()
            .map_err(|err| AppError::configuration(format!("invalid PORT: {err}")))?,
        None => DEFAULT_PORT,
    };

    let backend = match lookup("STORAGE_BACKEND") {
        Some(value) => parse_backend(&value)?,
        None => StorageBackend::MongoDb,
    };

    let connect_timeout_ms = lookup("MONGODB_CONNECT_TIMEOUT_MS")
        .map(|value| {
            value.trim().parse::<u64>().map_err(|err| {
                AppError::configuration(format!("invalid MONGODB_CONNECT_TIMEOUT_MS: {err}"))
            })
        })
        .transpose()?;

    let mongo = MongoConfig {
        uri: lookup("MONGODB_URI").unwrap_or_else(|| DEFAULT_MONGODB_URI.to_string()),
        database: lookup("MONGODB_DATABASE").unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
        collection: lookup("MONGODB_COLLECTION").unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
        connect_timeout_ms,
    };

    let db_path = lookup("PRENDAS_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string());

    Ok(AppConfig {
        port,
        backend,
        mongo,
        db_path,
    })
}

fn parse_backend(value: &str) -> Result<StorageBackend, AppError> {
    match value.trim().to_lowercase().as_str() {
        "mongodb" | "mongo" => Ok(StorageBackend::MongoDb),
        "sled" => Ok(StorageBackend::Sled),
        other => Err(AppError::configuration(format!(
            "unsupported STORAGE_BACKEND: {other}"
        ))),
    }
}
