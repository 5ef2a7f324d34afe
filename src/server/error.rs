//! HTTP error responses.
//!
//! Every failure leaves the service as a JSON body `{"detail": "..."}`.
//! Request-shape problems are 422, conversion and source failures are 400,
//! and anything host-side is 500.

use axum::Json;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tokio::task::JoinError;

use crate::error::{ConversionError, SourceError};

/// An error ready to be rendered as an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The request could not be parsed or is missing a field (422).
    Unprocessable(String),
    /// The request parsed but the operation rejected it (400).
    BadRequest(String),
    /// The upload exceeded the configured limit (413).
    PayloadTooLarge(String),
    /// Something failed on the host (500).
    Internal(String),
}

impl ApiError {
    /// Status code for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text placed in the `detail` field.
    pub fn detail(&self) -> String {
        match self {
            ApiError::Unprocessable(message)
            | ApiError::BadRequest(message)
            | ApiError::PayloadTooLarge(message) => message.clone(),
            ApiError::Internal(message) => format!("Internal server error: {message}"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("{}", self.detail());
        } else {
            log::debug!("Rejecting request with {status}: {}", self.detail());
        }
        (status, Json(json!({ "detail": self.detail() }))).into_response()
    }
}

impl From<ConversionError> for ApiError {
    fn from(error: ConversionError) -> Self {
        if error.is_internal() {
            ApiError::Internal(error.to_string())
        } else {
            ApiError::BadRequest(error.to_string())
        }
    }
}

impl From<SourceError> for ApiError {
    fn from(error: SourceError) -> Self {
        if error.is_internal() {
            ApiError::Internal(error.to_string())
        } else {
            ApiError::BadRequest(error.to_string())
        }
    }
}

impl From<JoinError> for ApiError {
    fn from(error: JoinError) -> Self {
        ApiError::Internal(format!("worker task failed: {error}"))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Unprocessable(rejection.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Unprocessable(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::Unprocessable(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(error: MultipartError) -> Self {
        if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(error.body_text())
        } else {
            ApiError::Unprocessable(error.body_text())
        }
    }
}
