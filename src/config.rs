// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use std::env;

/// Where accounts are persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process-local map; state is lost on restart.
    Memory,
    /// Cloud Firestore in the given GCP project.
    Firestore { project_id: String },
}

impl StoreBackend {
    /// Parse a store connection string: `memory` or `firestore://<project>`.
    pub fn parse(url: &str) -> Result<Self, ConfigError> {
        let url = url.trim();
        if url.eq_ignore_ascii_case("memory") || url == "memory://" {
            return Ok(StoreBackend::Memory);
        }

        match url.strip_prefix("firestore://") {
            Some(project) if !project.is_empty() && !project.contains('/') => {
                Ok(StoreBackend::Firestore {
                    project_id: project.to_string(),
                })
            }
            _ => Err(ConfigError::Invalid("STORE_URL", url.to_string())),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Server port
    pub port: u16,
    /// Store connection string (`memory` or `firestore://<project>`)
    pub store_url: String,
    /// Mini-app URL used for bot buttons and CORS
    pub web_app_url: String,
    /// Reject payloads whose `auth_date` is older than this many seconds
    pub init_data_max_age_secs: Option<u64>,

    // --- Secrets ---
    /// Platform bot credential; the payload signing key is derived from it
    pub bot_token: String,
    /// Expected `X-Telegram-Bot-Api-Secret-Token` on bot webhook calls
    pub webhook_secret: Option<String>,
}

impl Config {
    /// Config for testing only.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            store_url: "memory".to_string(),
            web_app_url: "http://localhost:5173".to_string(),
            init_data_max_age_secs: None,
            bot_token: "123456:TEST-bot-token".to_string(),
            webhook_secret: Some("test_webhook_secret".to_string()),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let init_data_max_age_secs = match env::var("INIT_DATA_MAX_AGE_SECS") {
            Ok(raw) => Some(
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::Invalid("INIT_DATA_MAX_AGE_SECS", raw))?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            store_url: env::var("STORE_URL").unwrap_or_else(|_| "memory".to_string()),
            web_app_url: env::var("WEB_APP_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            init_data_max_age_secs,

            bot_token: env::var("BOT_TOKEN")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("BOT_TOKEN"))?,
            webhook_secret: env::var("BOT_WEBHOOK_SECRET")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
        })
    }

    /// Resolve the configured store backend.
    pub fn store_backend(&self) -> Result<StoreBackend, ConfigError> {
        StoreBackend::parse(&self.store_url)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}
