use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;

pub async fn not_found_handler(uri: Uri) -> Response {
    tracing::debug!(path = %uri.path(), "no route");
    let err_msg = serde_json::json!({"error": "not found", "path": uri.path()});
    (StatusCode::NOT_FOUND, Json(err_msg)).into_response()
}
