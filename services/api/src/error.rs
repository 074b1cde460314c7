//! Error responses for the API service
//!
//! Every failure leaves the service as `{success: false, message, error?}`.

use std::sync::OnceLock;

use auth::AccountError;
use axum::{
    Json,
    extract::multipart::{MultipartError, MultipartRejection},
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use media::StorageError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

static EXPOSE_DETAILS: OnceLock<bool> = OnceLock::new();

/// Include internal error details in responses; set once at startup
pub fn expose_error_details(enabled: bool) {
    let _ = EXPOSE_DETAILS.set(enabled);
}

fn details_exposed() -> bool {
    EXPOSE_DETAILS.get().copied().unwrap_or(false)
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("Too many requests, please try again later.")]
    TooManyRequests,

    /// Unexpected failure; `detail` is logged and only shown in development
    #[error("{message}: {detail}")]
    Internal { message: String, detail: String },
}

impl ApiError {
    pub fn internal(message: &str, detail: impl ToString) -> Self {
        ApiError::Internal {
            message: message.to_string(),
            detail: detail.to_string(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        if err.is_internal() {
            return ApiError::internal("Internal server error", err);
        }
        match err {
            AccountError::Validation(m) => ApiError::BadRequest(m),
            AccountError::Authentication(m) => ApiError::Unauthorized(m),
            AccountError::Authorization(m) => ApiError::Forbidden(m),
            AccountError::Conflict(m) => ApiError::Conflict(m),
            AccountError::NotFound(m) => ApiError::NotFound(m),
            other => ApiError::internal("Internal server error", other),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::UnsupportedType(_) | StorageError::InvalidName(_) => {
                ApiError::BadRequest(err.to_string())
            }
            StorageError::TooLarge { .. } => ApiError::PayloadTooLarge(err.to_string()),
            StorageError::NotFound(_) => ApiError::NotFound(err.to_string()),
            other => ApiError::internal("File storage failed", other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(err.body_text())
        } else {
            ApiError::BadRequest(err.body_text())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match self {
            ApiError::Internal { message, detail } => {
                error!("{}: {}", message, detail);
                if details_exposed() {
                    json!({ "success": false, "message": message, "error": detail })
                } else {
                    json!({ "success": false, "message": message })
                }
            }
            other => json!({ "success": false, "message": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
