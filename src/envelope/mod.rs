//! Uniform response bodies and cross-origin headers.
//!
//! Success bodies are `{"data": ...}`, failures are `{"error": "..."}`, and
//! preflights are empty. All of them carry the CORS header set.

mod cors;
mod layer;

use axum::Json;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Value, json};

pub use cors::{
    ALLOW_CREDENTIALS, ALLOW_HEADERS, ALLOW_METHODS, MAX_AGE_SECONDS, apply_cors,
    has_cors_headers,
};
pub use layer::cors_envelope;

/// A response ready to leave the service.
#[derive(Debug, Clone)]
pub struct Envelope {
    status: StatusCode,
    body: Option<Value>,
    origin: Option<HeaderValue>,
}

impl Envelope {
    /// `200 {"data": data}`.
    ///
    /// A payload that fails to serialize becomes a 500 failure envelope.
    pub fn success<T: Serialize>(data: T) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => Self {
                status: StatusCode::OK,
                body: Some(json!({ "data": data })),
                origin: None,
            },
            Err(err) => {
                tracing::error!(error = %err, "failed to serialize response payload");
                Self::failure(
                    "Failed to serialize response",
                    StatusCode::INTERNAL_SERVER_ERROR,
                )
            }
        }
    }

    /// `{"error": message}` with the given status.
    pub fn failure(message: impl Into<String>, code: StatusCode) -> Self {
        Self {
            status: code,
            body: Some(json!({ "error": message.into() })),
            origin: None,
        }
    }

    /// `204` with an empty body, echoing `origin`.
    #[must_use]
    pub fn preflight(origin: Option<&HeaderValue>) -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            body: None,
            origin: origin.cloned(),
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// The CORS header set this envelope will be sent with.
    #[must_use]
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        apply_cors(&mut headers, self.origin.as_ref());
        headers
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        let headers = self.headers();
        match self.body {
            Some(body) => (self.status, headers, Json(body)).into_response(),
            None => (self.status, headers).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::header::ACCESS_CONTROL_ALLOW_ORIGIN;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn success_wraps_data() {
        let response = Envelope::success(vec!["a", "b"]).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(has_cors_headers(response.headers()));
        assert_eq!(body_json(response).await, json!({"data": ["a", "b"]}));
    }

    #[tokio::test]
    async fn failure_carries_message_status_and_headers() {
        let response =
            Envelope::failure("Name is required", StatusCode::BAD_REQUEST).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(has_cors_headers(response.headers()));
        assert_eq!(body_json(response).await, json!({"error": "Name is required"}));
    }

    #[tokio::test]
    async fn preflight_is_empty_and_echoes_origin() {
        let origin = HeaderValue::from_static("https://example.com");
        let response = Envelope::preflight(Some(&origin)).into_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://example.com"
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.is_empty());
    }
}
