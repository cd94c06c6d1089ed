//! The uniform response envelope.
//!
//! Every API response, success or failure, is one of two JSON shapes:
//!
//! ```json
//! {"success": true,  "data": ..., "meta": ...}
//! {"success": false, "error": "...", "code": "SOME_CODE", "details": ...}
//! ```
//!
//! `details` is attached only when the deployment is not flagged production,
//! so internals never leak to real clients. The `X-Request-Id` header is
//! stamped by the error-handler stage, which sees every outgoing response.

use crate::{FolioError, Response};
use bytes::Bytes;
use http::{header, StatusCode};
use http_body_util::Full;
use serde::Serialize;
use serde_json::json;

/// Builds a JSON response with the given status and body.
fn json_response(status: StatusCode, body: serde_json::Value) -> Response {
    http::Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .expect("statically valid response parts")
}

/// Builds a `200 OK` success envelope.
pub fn success<T: Serialize>(data: T) -> Response {
    json_response(
        StatusCode::OK,
        json!({"success": true, "data": serde_json::to_value(data).unwrap_or(serde_json::Value::Null)}),
    )
}

/// Builds a `200 OK` success envelope with a `meta` block (e.g. pagination).
pub fn success_with_meta<T: Serialize, M: Serialize>(data: T, meta: M) -> Response {
    json_response(
        StatusCode::OK,
        json!({
            "success": true,
            "data": serde_json::to_value(data).unwrap_or(serde_json::Value::Null),
            "meta": serde_json::to_value(meta).unwrap_or(serde_json::Value::Null),
        }),
    )
}

/// Builds a `201 Created` success envelope.
pub fn created<T: Serialize>(data: T) -> Response {
    json_response(
        StatusCode::CREATED,
        json!({"success": true, "data": serde_json::to_value(data).unwrap_or(serde_json::Value::Null)}),
    )
}

/// Builds the failure envelope for an error.
///
/// `expose_details` should be false in production. Rate-limited failures
/// carry an advisory `Retry-After` header.
pub fn failure(error: &FolioError, expose_details: bool) -> Response {
    let mut body = json!({
        "success": false,
        "error": error.to_string(),
        "code": error.code(),
    });

    if expose_details {
        if let Some(details) = error.details() {
            body["details"] = details;
        }
    }

    let mut response = json_response(error.status_code(), body);

    if let FolioError::RateLimited {
        retry_after_seconds,
    } = error
    {
        response.headers_mut().insert(
            header::RETRY_AFTER,
            http::HeaderValue::from(*retry_after_seconds),
        );
    }

    response
}
