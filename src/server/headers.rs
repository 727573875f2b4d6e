use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Every garment route answers with a JSON content type, plain-text messages included.
pub async fn json_content_type(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;

    if response.status() != StatusCode::NO_CONTENT {
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    }

    response
}
