use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{Bson, Document, doc};
use mongodb::error::ErrorKind;
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};
use serde_json::Value;

use crate::config::MongoConfig;
use crate::features::prendas::dto::{ID_FIELD, Prenda, SearchField};
use crate::features::prendas::store::{ConnectionProvider, PrendaConnection, StoreError};

pub struct MongoConnectionProvider {
    config: MongoConfig,
}

impl MongoConnectionProvider {
    pub fn new(config: MongoConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ConnectionProvider for MongoConnectionProvider {
    async fn connect(&self) -> Result<Arc<dyn PrendaConnection>, StoreError> {
        let mut options = ClientOptions::parse(&self.config.uri)
            .await
            .map_err(|err| StoreError::connection(format!("invalid MongoDB URI: {err}")))?;

        if let Some(timeout_ms) = self.config.connect_timeout_ms {
            let timeout = Duration::from_millis(timeout_ms);
            options.connect_timeout = Some(timeout);
            options.server_selection_timeout = Some(timeout);
        }

        let client = Client::with_options(options)
            .map_err(|err| StoreError::connection(format!("failed to build client: {err}")))?;

        // The driver connects lazily; ping so an unreachable server fails here.
        if let Err(err) = client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
        {
            client.shutdown().await;
            return Err(StoreError::connection(format!("ping failed: {err}")));
        }

        let collection = client
            .database(&self.config.database)
            .collection::<Document>(&self.config.collection);

        Ok(Arc::new(MongoConnection { client, collection }))
    }

    fn backend_name(&self) -> &'static str {
        "mongodb"
    }
}

struct MongoConnection {
    client: Client,
    collection: Collection<Document>,
}

#[async_trait]
impl PrendaConnection for MongoConnection {
    async fn find_all(&self) -> Result<Vec<Prenda>, StoreError> {
        let cursor = self.collection.find(doc! {}).await.map_err(query_error)?;
        collect_documents(cursor).await
    }

    async fn find_by_codigo(&self, codigo: i64) -> Result<Option<Prenda>, StoreError> {
        self.collection
            .find_one(doc! { "codigo": codigo })
            .await
            .map_err(query_error)?
            .map(document_to_prenda)
            .transpose()
    }

    async fn find_matching(
        &self,
        field: SearchField,
        pattern: &str,
    ) -> Result<Vec<Prenda>, StoreError> {
        let mut filter = Document::new();
        filter.insert(field.as_str(), doc! { "$regex": pattern, "$options": "i" });

        let to_store_error = |err: mongodb::error::Error| search_error(pattern, err);
        let cursor = self.collection.find(filter).await.map_err(to_store_error)?;
        let documents: Vec<Document> = cursor.try_collect().await.map_err(to_store_error)?;
        documents.into_iter().map(document_to_prenda).collect()
    }

    async fn insert_one(&self, prenda: &Prenda) -> Result<(), StoreError> {
        let document = prenda_to_document(prenda)?;
        self.collection
            .insert_one(document)
            .await
            .map_err(query_error)?;
        Ok(())
    }

    async fn update_one(&self, codigo: i64, patch: &Prenda) -> Result<u64, StoreError> {
        let set = prenda_to_document(patch)?;
        let result = self
            .collection
            .update_one(doc! { "codigo": codigo }, doc! { "$set": set })
            .await
            .map_err(query_error)?;
        Ok(result.matched_count)
    }

    async fn delete_one(&self, codigo: i64) -> Result<u64, StoreError> {
        let result = self
            .collection
            .delete_one(doc! { "codigo": codigo })
            .await
            .map_err(query_error)?;
        Ok(result.deleted_count)
    }

    async fn disconnect(&self) -> Result<(), StoreError> {
        self.client.clone().shutdown().await;
        Ok(())
    }
}

fn query_error(err: mongodb::error::Error) -> StoreError {
    StoreError::query(err.to_string())
}

/// Error code the server returns when a `$regex` does not compile.
const INVALID_REGEX_CODE: i32 = 51091;

fn search_error(pattern: &str, err: mongodb::error::Error) -> StoreError {
    if let ErrorKind::Command(command) = err.kind.as_ref() {
        if is_invalid_regex(command.code, &command.message) {
            return StoreError::invalid_pattern(pattern, command.message.clone());
        }
    }
    query_error(err)
}

fn is_invalid_regex(code: i32, message: &str) -> bool {
    code == INVALID_REGEX_CODE || message.contains("Regular expression is invalid")
}

async fn collect_documents(cursor: mongodb::Cursor<Document>) -> Result<Vec<Prenda>, StoreError> {
    let documents: Vec<Document> = cursor.try_collect().await.map_err(query_error)?;
    documents.into_iter().map(document_to_prenda).collect()
}

fn prenda_to_document(prenda: &Prenda) -> Result<Document, StoreError> {
    mongodb::bson::to_document(prenda)
        .map_err(|err| StoreError::codec(format!("failed to encode document: {err}")))
}

/// Relaxed extended JSON, except that an ObjectId `_id` is rendered as its hex string.
fn document_to_prenda(mut document: Document) -> Result<Prenda, StoreError> {
    if let Some(Bson::ObjectId(id)) = document.get(ID_FIELD).cloned() {
        document.insert(ID_FIELD, Bson::String(id.to_hex()));
    }

    match Bson::Document(document).into_relaxed_extjson() {
        Value::Object(fields) => Ok(Prenda::new(fields)),
        other => Err(StoreError::codec(format!("expected a JSON object, got {other}"))),
    }
}
