use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::envelope::Envelope;
use crate::error::{DalError, ErrorKind};

pub const CONNECTION_FAILED: &str = "Database connection failed. Please try again later.";
pub const INTERNAL_ERROR: &str = "An unexpected error occurred while processing the request.";

/// The one place where a [`DalError`] becomes an HTTP status and public message.
///
/// Database error text is logged, never returned.
#[derive(Debug)]
pub struct ApiError(pub DalError);

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self(DalError::ValidationError(message.into()))
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self(DalError::NotFound(resource.into()))
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Connection => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Query | ErrorKind::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub fn public_message(&self) -> String {
        match self.0.kind() {
            ErrorKind::Validation | ErrorKind::NotFound => self.0.to_string(),
            ErrorKind::Connection => CONNECTION_FAILED.to_string(),
            ErrorKind::Query | ErrorKind::Unknown => INTERNAL_ERROR.to_string(),
        }
    }

    #[must_use]
    pub fn into_envelope(self) -> Envelope {
        match self.0.kind() {
            ErrorKind::Connection => tracing::warn!(error = %self.0, "database unavailable"),
            ErrorKind::Query | ErrorKind::Unknown => {
                tracing::error!(error = %self.0, "request failed");
            }
            ErrorKind::Validation | ErrorKind::NotFound => {}
        }
        Envelope::failure(self.public_message(), self.status())
    }
}

impl From<DalError> for ApiError {
    fn from(err: DalError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.into_envelope().into_response()
    }
}
