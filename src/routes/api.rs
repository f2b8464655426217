// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Mini-app API routes.

use crate::error::{AppError, AuthError, Result};
use crate::middleware::auth::{require_auth, AuthUser};
use crate::services::SpinOutcome;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Message returned when the daily quota is used up.
pub const NO_SPINS_LEFT: &str = "No spins left today";

/// API routes. `/api/spin` authenticates from its body, `/api/me` from the
/// Authorization header.
pub fn routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let header_authed = Router::new()
        .route("/api/me", get(get_me))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new()
        .route("/api/spin", post(spin))
        .merge(header_authed)
}

// ─── Spin ────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SpinRequest {
    #[serde(rename = "initData", default)]
    init_data: Option<String>,
}

/// Successful spin.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SpinResponse {
    pub reward: String,
    pub balance: f64,
    pub spins_left: u32,
}

/// Quota exhausted. Returned with 200: this is a normal outcome.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct NoSpinsResponse {
    pub error: String,
    pub spins_left: u32,
}

/// Spin the wheel for the caller identified by `initData`.
async fn spin(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<SpinRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let init_data = request
        .init_data
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| AuthError::Malformed("missing initData".to_string()))?;

    let identity = state.verifier.verify(&init_data).inspect_err(|e| {
        tracing::warn!(error = %e, "Rejected spin payload");
    })?;

    let response = match state.spin_engine.spin(&identity).await? {
        SpinOutcome::Granted {
            reward_label,
            balance,
            spins_remaining,
            ..
        } => Json(SpinResponse {
            reward: reward_label.to_string(),
            balance,
            spins_left: spins_remaining,
        })
        .into_response(),
        SpinOutcome::NoSpinsLeft { spins_remaining } => Json(NoSpinsResponse {
            error: NO_SPINS_LEFT.to_string(),
            spins_left: spins_remaining,
        })
        .into_response(),
    };

    Ok(response)
}

// ─── Account ─────────────────────────────────────────────────

/// Current account state.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AccountResponse {
    pub identity: String,
    pub balance: f64,
    /// Spins available now, counting a rollover not yet applied
    pub spins_left: u32,
    pub reward_history: Vec<String>,
}

/// Get the caller's account, creating it on first contact.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<AccountResponse>> {
    let account = state
        .store
        .get_or_create(&user.identity, state.clock.now())
        .await?;

    Ok(Json(AccountResponse {
        spins_left: account.effective_spins(state.clock.now()),
        identity: account.identity,
        balance: account.balance,
        reward_history: account.reward_history,
    }))
}
