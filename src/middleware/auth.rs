// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Signed-payload authentication middleware.

use crate::error::{AppError, AuthError};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// Authorization scheme carrying a raw launch payload.
pub const AUTH_SCHEME: &str = "tma ";

/// Authenticated caller extracted from the launch payload.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub identity: String,
}

/// Middleware that requires `Authorization: tma <payload>`.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let payload = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix(AUTH_SCHEME));

    let Some(payload) = payload else {
        return AppError::Auth(AuthError::Malformed(
            "missing Authorization: tma header".to_string(),
        ))
        .into_response();
    };

    let identity = match state.verifier.verify(payload) {
        Ok(identity) => identity,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected payload in Authorization header");
            return AppError::Auth(e).into_response();
        }
    };

    request.extensions_mut().insert(AuthUser { identity });

    next.run(request).await
}
