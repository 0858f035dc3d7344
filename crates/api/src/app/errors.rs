use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use tillcredit_credit::{CreditError, ErrorKind};

use crate::context::RequestContext;

pub fn credit_error_to_response(err: CreditError, ctx: &RequestContext) -> axum::response::Response {
    let kind = err.kind();
    let status = match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::ValidationError => StatusCode::BAD_REQUEST,
        ErrorKind::UpstreamError => StatusCode::BAD_GATEWAY,
    };
    if kind == ErrorKind::UpstreamError {
        tracing::error!(request_id = %ctx.request_id(), error = %err, "record store failure");
    }
    json_error(status, kind, err.to_string())
}

pub fn validation_error(message: impl Into<String>) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, ErrorKind::ValidationError, message)
}

pub fn json_error(
    status: StatusCode,
    kind: ErrorKind,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "error": kind.as_str(),
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn json_ok(data: serde_json::Value) -> axum::response::Response {
    (
        StatusCode::OK,
        axum::Json(json!({
            "success": true,
            "data": data,
        })),
    )
        .into_response()
}
