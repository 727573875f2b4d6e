use axum::Router;
use axum::middleware;
use axum::routing::get;

use crate::features::prendas::{
    handle_create_prenda, handle_delete_prenda, handle_get_prenda, handle_list_prendas,
    handle_patch_prenda, handle_search_by_categoria, handle_search_by_nombre, handle_welcome,
};
use crate::server::{AppState, json_content_type};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/prendas",
            get(handle_list_prendas).post(handle_create_prenda),
        )
        .route(
            "/prenda/:id",
            get(handle_get_prenda)
                .patch(handle_patch_prenda)
                .delete(handle_delete_prenda),
        )
        .route("/prenda/nombre/:nombre", get(handle_search_by_nombre))
        .route("/prenda/categoria/:categoria", get(handle_search_by_categoria))
        .layer(middleware::from_fn(json_content_type))
        // Registered after the layer so the welcome text keeps its text/plain type.
        .route("/", get(handle_welcome))
        .with_state(state)
}
