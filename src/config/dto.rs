use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub port: u16,
    pub backend: StorageBackend,
    pub mongo: MongoConfig,
    pub db_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    MongoDb,
    Sled,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
    pub collection: String,
    /// Applied to both connect and server selection. `None` keeps the driver defaults.
    pub connect_timeout_ms: Option<u64>,
}
