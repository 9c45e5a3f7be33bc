use axum::{
    Json,
    extract::multipart::MultipartError,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::{Error, Result as StoreResult};

/// Plain-text status message, the contract of the form endpoints.
#[derive(Debug)]
pub struct Message {
    pub status: StatusCode,
    pub text: &'static str,
}

impl Message {
    #[must_use]
    pub fn ok(text: &'static str) -> Self {
        Self {
            status: StatusCode::OK,
            text,
        }
    }

    #[must_use]
    pub fn new(status: StatusCode, text: &'static str) -> Self {
        Self { status, text }
    }
}

impl IntoResponse for Message {
    fn into_response(self) -> Response {
        (
            self.status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.text,
        )
            .into_response()
    }
}

/// API error that converts to a proper HTTP response
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    /// Maps a store error, logging it. Clients only see `message`, except for
    /// timeouts which surface as 503.
    #[must_use]
    pub fn from_store(e: Error, message: &'static str) -> Self {
        match e {
            Error::Timeout => {
                tracing::warn!("{message}: storage timed out");
                Self::service_unavailable("Storage operation timed out")
            }
            e => {
                tracing::error!("{message}: {e}");
                Self::internal(message)
            }
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        Self {
            status: e.status(),
            message: format!("Failed to read upload: {}", e.body_text()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "data": null, "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

/// Extension trait for converting store results to API errors with a custom message.
pub trait StoreResultExt<T> {
    fn api_err(self, message: &'static str) -> Result<T, ApiError>;
}

impl<T> StoreResultExt<T> for StoreResult<T> {
    fn api_err(self, message: &'static str) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::from_store(e, message))
    }
}

/// Extension for Option types from store operations.
pub trait StoreOptionExt<T> {
    fn or_not_found(self, message: &'static str) -> Result<T, ApiError>;
}

impl<T> StoreOptionExt<T> for Option<T> {
    fn or_not_found(self, message: &'static str) -> Result<T, ApiError> {
        self.ok_or_else(|| ApiError::not_found(message))
    }
}
