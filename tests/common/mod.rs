// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use chrono::{DateTime, TimeZone, Utc};
use spin_rewards::config::Config;
use spin_rewards::db::AccountStore;
use spin_rewards::routes::create_router;
use spin_rewards::services::verifier::sign_payload;
use spin_rewards::time_utils::ManualClock;
use spin_rewards::AppState;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Noon UTC on 2024-06-15; the fixed "today" of these tests.
#[allow(dead_code)]
pub fn today() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
}

/// Create a test app over an in-memory store and a clock pinned to `today()`.
/// Returns the router, the shared state, and the clock.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, Arc<ManualClock>) {
    create_test_app_with_store(AccountStore::new_in_memory())
}

#[allow(dead_code)]
pub fn create_test_app_with_store(
    store: AccountStore,
) -> (axum::Router, Arc<AppState>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(today()));
    let state = Arc::new(AppState::new(Config::test_default(), store, clock.clone()));
    (create_router(state.clone()), state, clock)
}

/// A payload for `user_id` signed with the test bot token.
#[allow(dead_code)]
pub fn signed_init_data(user_id: u64) -> String {
    let user = format!(r#"{{"id":{},"first_name":"Test","username":"tester"}}"#, user_id);
    sign_payload(
        &Config::test_default().bot_token,
        &[
            ("query_id", "AAHdF6IQAAAAAN0XohDhrOrc"),
            ("user", user.as_str()),
            ("auth_date", "1718452800"),
        ],
    )
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
