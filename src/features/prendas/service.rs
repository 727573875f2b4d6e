use std::future::Future;
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::core::error::AppError;
use crate::features::prendas::dto::{Prenda, SearchField};
use crate::features::prendas::helpers::{
    CREATE_BAD_REQUEST, CREATE_CONNECT_ERROR, CREATE_QUERY_ERROR, DELETE_CONNECT_ERROR,
    DELETE_QUERY_ERROR, GET_CONNECT_ERROR, GET_QUERY_ERROR, LIST_CONNECT_ERROR, LIST_QUERY_ERROR,
    PATCH_BAD_REQUEST, PATCH_CONNECT_ERROR, PATCH_QUERY_ERROR, SEARCH_CONNECT_ERROR,
    SEARCH_QUERY_ERROR, describe_codigo, parse_codigo,
};
use crate::features::prendas::store::{ConnectionProvider, PrendaConnection, StoreError};

pub struct PrendaService {
    provider: Arc<dyn ConnectionProvider>,
}

impl PrendaService {
    pub fn new(provider: Arc<dyn ConnectionProvider>) -> Self {
        Self { provider }
    }

    pub fn backend_name(&self) -> &'static str {
        self.provider.backend_name()
    }

    pub async fn list_prendas(&self) -> Result<Vec<Prenda>, AppError> {
        self.scoped(
            "list_prendas",
            LIST_CONNECT_ERROR,
            LIST_QUERY_ERROR,
            |connection| async move { connection.find_all().await },
        )
        .await
    }

    pub async fn get_prenda(&self, raw_id: &str) -> Result<Prenda, AppError> {
        let codigo = parse_codigo(raw_id);

        let found = self
            .scoped(
                "get_prenda",
                GET_CONNECT_ERROR,
                GET_QUERY_ERROR,
                move |connection| async move {
                    match codigo {
                        Some(codigo) => connection.find_by_codigo(codigo).await,
                        None => Ok(None),
                    }
                },
            )
            .await?;

        found.ok_or_else(|| {
            AppError::not_found(format!(
                "Prenda con id: {} no encontrada.",
                describe_codigo(codigo)
            ))
        })
    }

    pub async fn search_prendas(
        &self,
        field: SearchField,
        query: &str,
    ) -> Result<Vec<Prenda>, AppError> {
        let pattern = query.to_string();
        let matches = self
            .scoped(
                "search_prendas",
                SEARCH_CONNECT_ERROR,
                SEARCH_QUERY_ERROR,
                move |connection| async move { connection.find_matching(field, &pattern).await },
            )
            .await?;

        if matches.is_empty() {
            let message = match field {
                SearchField::Nombre => format!("No se encontro prenda con {query}"),
                SearchField::Categoria => {
                    format!("No se encontraron prendas con la categoría: {query}.")
                }
            };
            return Err(AppError::not_found(message));
        }

        Ok(matches)
    }

    /// Inserts the document as supplied and returns it unchanged. An empty object is a
    /// valid document; only an absent body is rejected.
    pub async fn create_prenda(&self, body: Option<Prenda>) -> Result<Prenda, AppError> {
        let prenda = body.ok_or_else(|| AppError::bad_request(CREATE_BAD_REQUEST))?;

        let document = prenda.clone();
        self.scoped(
            "create_prenda",
            CREATE_CONNECT_ERROR,
            CREATE_QUERY_ERROR,
            move |connection| async move { connection.insert_one(&document).await },
        )
        .await?;

        debug!(codigo = ?prenda.codigo(), "prenda created");
        Ok(prenda)
    }

    /// Applies `patch` to the first document with the given `codigo` and returns the patch.
    /// Succeeds even when no document matched.
    pub async fn patch_prenda(
        &self,
        raw_id: &str,
        body: Option<Prenda>,
    ) -> Result<Prenda, AppError> {
        let codigo = parse_codigo(raw_id).filter(|codigo| *codigo != 0);
        let patch = body.filter(|patch| !patch.is_empty());
        let (Some(codigo), Some(patch)) = (codigo, patch) else {
            return Err(AppError::bad_request(PATCH_BAD_REQUEST));
        };

        let fields = patch.clone();
        let matched = self
            .scoped(
                "patch_prenda",
                PATCH_CONNECT_ERROR,
                PATCH_QUERY_ERROR,
                move |connection| async move { connection.update_one(codigo, &fields).await },
            )
            .await?;

        debug!(codigo, matched, "prenda patched");
        Ok(patch)
    }

    pub async fn delete_prenda(&self, raw_id: &str) -> Result<(), AppError> {
        let Some(codigo) = parse_codigo(raw_id).filter(|codigo| *codigo != 0) else {
            return Err(AppError::bad_request(format!(
                "No se puede eliminar la prenda con id: {}.",
                describe_codigo(parse_codigo(raw_id))
            )));
        };

        let deleted = self
            .scoped(
                "delete_prenda",
                DELETE_CONNECT_ERROR,
                DELETE_QUERY_ERROR,
                move |connection| async move { connection.delete_one(codigo).await },
            )
            .await?;

        if deleted == 0 {
            return Err(AppError::not_found(format!(
                "No se pudo eliminar la prenda con id: {codigo}"
            )));
        }

        debug!(codigo, "prenda deleted");
        Ok(())
    }

    /// Opens a connection, runs `run` on it and disconnects on every path before returning.
    async fn scoped<T, F, Fut>(
        &self,
        operation: &'static str,
        connect_message: &'static str,
        query_message: &'static str,
        run: F,
    ) -> Result<T, AppError>
    where
        F: FnOnce(Arc<dyn PrendaConnection>) -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let connection = self.provider.connect().await.map_err(|err| {
            error!(
                operation,
                backend = self.provider.backend_name(),
                error = %err,
                "database connection failed"
            );
            AppError::internal(connect_message)
        })?;

        let outcome = run(connection.clone()).await;

        if let Err(err) = connection.disconnect().await {
            warn!(operation, error = %err, "failed to close database connection");
        }

        outcome.map_err(|err| match err {
            StoreError::InvalidPattern { pattern, reason } => {
                debug!(operation, %pattern, %reason, "rejecting search pattern");
                AppError::bad_request(format!("Patrón de búsqueda inválido: {pattern}"))
            }
            other => {
                error!(operation, error = %other, "database operation failed");
                AppError::internal(query_message)
            }
        })
    }
}
