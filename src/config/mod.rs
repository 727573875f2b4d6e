pub mod dto;
pub mod loader;

pub use dto::{AppConfig, MongoConfig, StorageBackend};
pub use loader::{config_from_lookup, load_config};
