use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode};
use serde_json::json;

use tillcredit_credit::ErrorKind;

use crate::app::errors;
use crate::app::services::AppServices;

pub async fn health(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    errors::json_ok(json!({
        "status": "ok",
        "store": services.backend(),
    }))
}

pub async fn not_found() -> axum::response::Response {
    errors::json_error(StatusCode::NOT_FOUND, ErrorKind::NotFound, "no such endpoint")
}

/// Path matched but the method did not.
pub async fn method_not_allowed() -> axum::response::Response {
    errors::json_error(
        StatusCode::METHOD_NOT_ALLOWED,
        ErrorKind::ValidationError,
        "method not allowed for this endpoint",
    )
}
