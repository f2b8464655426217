// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Webhook route for bot updates.
//!
//! Replies are returned in the webhook response body as a `sendMessage`
//! method call, so no outbound API client is needed.

use crate::services::BotCommand;
use crate::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Header the platform sets to the secret registered with the webhook.
pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Webhook routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/bot/webhook", post(handle_update))
}

/// Incoming update (only the fields we use).
#[derive(Deserialize, Debug)]
struct Update {
    update_id: i64,
    #[serde(default)]
    message: Option<Message>,
}

#[derive(Deserialize, Debug)]
struct Message {
    chat: Chat,
    #[serde(default)]
    from: Option<User>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
struct Chat {
    id: i64,
}

#[derive(Deserialize, Debug)]
struct User {
    id: i64,
    #[serde(default)]
    first_name: Option<String>,
}

/// `sendMessage` call returned inline in the webhook response.
#[derive(Serialize, Debug)]
struct SendMessage {
    method: &'static str,
    chat_id: i64,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<InlineKeyboard>,
}

#[derive(Serialize, Debug)]
struct InlineKeyboard {
    inline_keyboard: Vec<Vec<InlineButton>>,
}

#[derive(Serialize, Debug)]
struct InlineButton {
    text: String,
    web_app: WebAppInfo,
}

#[derive(Serialize, Debug)]
struct WebAppInfo {
    url: String,
}

fn secret_matches(headers: &HeaderMap, expected: &str) -> bool {
    headers
        .get(SECRET_HEADER)
        .map(|v| bool::from(v.as_bytes().ct_eq(expected.as_bytes())))
        .unwrap_or(false)
}

/// Handle an incoming update (POST).
async fn handle_update(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<serde_json::Value>,
) -> Response {
    if let Some(expected) = &state.config.webhook_secret {
        if !secret_matches(&headers, expected) {
            tracing::warn!("Security Alert: Bot webhook secret mismatch");
            return StatusCode::FORBIDDEN.into_response();
        }
    }

    let update: Update = match serde_json::from_value(payload) {
        Ok(u) => u,
        Err(e) => {
            tracing::error!(error = %e, "Failed to parse bot update");
            return StatusCode::OK.into_response(); // Still return 200 to avoid redelivery
        }
    };

    let Some(message) = update.message else {
        tracing::debug!(update_id = update.update_id, "Ignoring non-message update");
        return StatusCode::OK.into_response();
    };

    let (Some(from), Some(command)) = (
        message.from,
        message.text.as_deref().and_then(BotCommand::parse),
    ) else {
        return StatusCode::OK.into_response();
    };

    let identity = from.id.to_string();
    let reply = match state
        .commands
        .handle(&identity, from.first_name.as_deref(), command)
        .await
    {
        Ok(reply) => reply,
        Err(e) => {
            // Non-2xx makes the platform redeliver the update later
            tracing::error!(identity = %identity, error = %e, "Bot command failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let reply_markup = reply.web_app_button.map(|(text, url)| InlineKeyboard {
        inline_keyboard: vec![vec![InlineButton {
            text,
            web_app: WebAppInfo { url },
        }]],
    });

    Json(SendMessage {
        method: "sendMessage",
        chat_id: message.chat.id,
        text: reply.text,
        reply_markup,
    })
    .into_response()
}
