//! Response envelope (§6: `{ success, data?, error?, timestamp }`) —
//! contractual per spec.md, unlike the teacher's own `{ data, meta }` v2
//! shape in `api/envelope.rs`; kept as the same kind of small
//! `IntoResponse`-producing helper type so handlers never hand-build JSON.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: String,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(status: StatusCode, data: T) -> Response {
        let body = Envelope { success: true, data: Some(data), error: None, timestamp: Utc::now().to_rfc3339() };
        (status, axum::Json(body)).into_response()
    }
}

/// Error envelope has no `T` to infer — `()` satisfies `Serialize` and is
/// skipped by `data`'s `skip_serializing_if`.
pub fn error(status: StatusCode, message: impl Into<String>) -> Response {
    let body = Envelope::<()> { success: false, data: None, error: Some(message.into()), timestamp: Utc::now().to_rfc3339() };
    (status, axum::Json(body)).into_response()
}

pub fn bad_request(message: impl Into<String>) -> Response {
    error(StatusCode::BAD_REQUEST, message)
}

pub fn not_found(message: impl Into<String>) -> Response {
    error(StatusCode::NOT_FOUND, message)
}

pub fn internal(message: impl Into<String>) -> Response {
    error(StatusCode::INTERNAL_SERVER_ERROR, message)
}

pub fn conflict(message: impl Into<String>) -> Response {
    error(StatusCode::CONFLICT, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ok_envelope_has_success_true() {
        let resp = Envelope::ok(StatusCode::OK, serde_json::json!({"id": "abc"}));
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["success"], true);
        assert_eq!(v["data"]["id"], "abc");
        assert!(v.get("error").is_none());
    }

    #[tokio::test]
    async fn error_envelope_has_success_false() {
        let resp = bad_request("name is required");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["success"], false);
        assert_eq!(v["error"], "name is required");
    }
}
