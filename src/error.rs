// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Reasons a signed payload is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Malformed payload: {0}")]
    Malformed(String),

    #[error("Payload signature does not match")]
    InvalidSignature,

    #[error("Payload carries no resolvable user identity")]
    NoIdentity,

    #[error("Payload is older than the accepted age")]
    Expired,
}

/// Account store failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Store unreachable: {0}")]
    Unreachable(String),

    #[error("Store constraint violated: {0}")]
    ConstraintViolation(String),
}

/// Global reset failures. Logged by the scheduler, never propagated.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Reset could not reach the store: {0}")]
    StoreUnreachable(#[source] StoreError),
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Auth(AuthError::Malformed(_)) | AppError::Auth(AuthError::NoIdentity) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Auth(AuthError::InvalidSignature) | AppError::Auth(AuthError::Expired) => {
                StatusCode::FORBIDDEN
            }
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error, details) = match &self {
            AppError::Auth(AuthError::Malformed(msg)) => ("malformed_payload", Some(msg.clone())),
            AppError::Auth(AuthError::NoIdentity) => ("no_identity", None),
            AppError::Auth(AuthError::InvalidSignature) => ("invalid_signature", None),
            AppError::Auth(AuthError::Expired) => ("expired_payload", None),
            AppError::BadRequest(msg) => ("bad_request", Some(msg.clone())),
            AppError::Store(err) => {
                tracing::error!(error = %err, "Store error");
                ("store_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                ("internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
