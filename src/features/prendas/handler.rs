use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use crate::core::error::AppError;
use crate::features::prendas::dto::{Prenda, SearchField};
use crate::features::prendas::helpers::{PATCH_QUERY_ERROR, WELCOME_MESSAGE, parse_body};
use crate::server::AppState;

pub async fn handle_welcome() -> &'static str {
    WELCOME_MESSAGE
}

pub async fn handle_list_prendas(
    State(state): State<AppState>,
) -> Result<Json<Vec<Prenda>>, AppError> {
    state.service.list_prendas().await.map(Json)
}

pub async fn handle_get_prenda(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Prenda>, AppError> {
    state.service.get_prenda(&id).await.map(Json)
}

pub async fn handle_search_by_nombre(
    State(state): State<AppState>,
    Path(nombre): Path<String>,
) -> Result<Json<Vec<Prenda>>, AppError> {
    state
        .service
        .search_prendas(SearchField::Nombre, &nombre)
        .await
        .map(Json)
}

pub async fn handle_search_by_categoria(
    State(state): State<AppState>,
    Path(categoria): Path<String>,
) -> Result<Json<Vec<Prenda>>, AppError> {
    state
        .service
        .search_prendas(SearchField::Categoria, &categoria)
        .await
        .map(Json)
}

pub async fn handle_create_prenda(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Prenda>), AppError> {
    let created = state.service.create_prenda(parse_body(&body)).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn handle_patch_prenda(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, String), AppError> {
    let patch = state.service.patch_prenda(&id, parse_body(&body)).await?;
    let rendered = serde_json::to_string(&patch).map_err(|err| {
        tracing::error!(error = %err, "failed to serialise patch");
        AppError::internal(PATCH_QUERY_ERROR)
    })?;

    Ok((
        StatusCode::CREATED,
        format!("Se modifico el precio correctamente.\n{rendered}"),
    ))
}

pub async fn handle_delete_prenda(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.service.delete_prenda(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
