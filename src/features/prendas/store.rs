use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::features::prendas::dto::{Prenda, SearchField};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("query failed: {0}")]
    Query(String),
    #[error("document codec failed: {0}")]
    Codec(String),
    #[error("invalid search pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

impl StoreError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::Query(message.into())
    }

    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec(message.into())
    }

    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }
}

/// Hands out one connection per request. Nothing is shared between the connections it
/// returns beyond what the backend itself shares.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn PrendaConnection>, StoreError>;

    fn backend_name(&self) -> &'static str;
}

#[async_trait]
pub trait PrendaConnection: Send + Sync {
    async fn find_all(&self) -> Result<Vec<Prenda>, StoreError>;

    async fn find_by_codigo(&self, codigo: i64) -> Result<Option<Prenda>, StoreError>;

    /// Case-insensitive regex match of `pattern` against `field`. A pattern the backend
    /// cannot compile is reported as `StoreError::InvalidPattern`.
    async fn find_matching(
        &self,
        field: SearchField,
        pattern: &str,
    ) -> Result<Vec<Prenda>, StoreError>;

    async fn insert_one(&self, prenda: &Prenda) -> Result<(), StoreError>;

    /// Returns the number of matched documents (0 or 1).
    async fn update_one(&self, codigo: i64, patch: &Prenda) -> Result<u64, StoreError>;

    /// Returns the number of deleted documents (0 or 1).
    async fn delete_one(&self, codigo: i64) -> Result<u64, StoreError>;

    async fn disconnect(&self) -> Result<(), StoreError>;
}
