// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Spin-Rewards: daily reward spins for a chat-platform mini-app
//!
//! This crate provides the backend API that authenticates mini-app callers
//! from their signed launch payload, enforces a daily spin quota, and keeps
//! a per-user reward balance.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::AccountStore;
use services::{CommandHandler, PayloadVerifier, SpinEngine};
use std::sync::Arc;
use time_utils::Clock;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: AccountStore,
    pub verifier: PayloadVerifier,
    pub spin_engine: SpinEngine,
    pub commands: CommandHandler,
    pub clock: Arc<dyn Clock>,
    pub started_at: std::time::Instant,
}

impl AppState {
    /// Wire services over `store` using `clock` for all day arithmetic.
    pub fn new(config: Config, store: AccountStore, clock: Arc<dyn Clock>) -> Self {
        let verifier =
            PayloadVerifier::new(&config.bot_token).with_max_age(config.init_data_max_age_secs);
        let spin_engine = SpinEngine::new(store.clone(), clock.clone());
        let commands = CommandHandler::new(store.clone(), clock.clone(), config.web_app_url.clone());

        Self {
            config,
            store,
            verifier,
            spin_engine,
            commands,
            clock,
            started_at: std::time::Instant::now(),
        }
    }
}
