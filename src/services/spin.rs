// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Spin processing: daily rollover, quota enforcement, and reward grants.

use std::sync::Arc;

use crate::db::AccountStore;
use crate::error::StoreError;
use crate::models::{draw_reward, Account};
use crate::time_utils::Clock;

/// Result of a spin that reached the store.
#[derive(Debug, Clone, PartialEq)]
pub enum SpinOutcome {
    /// A spin was consumed. `reward_value` is 0 for the empty outcome.
    Granted {
        reward_label: &'static str,
        reward_value: f64,
        balance: f64,
        spins_remaining: u32,
    },
    /// Quota exhausted for today; nothing was changed.
    NoSpinsLeft { spins_remaining: u32 },
}

/// Applies spins to accounts.
///
/// Holds no locks of its own: every step of a spin runs inside a single
/// `AccountStore::apply_spin_update`, which is where concurrent spins for
/// one identity serialize.
#[derive(Clone)]
pub struct SpinEngine {
    store: AccountStore,
    clock: Arc<dyn Clock>,
}

impl SpinEngine {
    pub fn new(store: AccountStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Spin once for `identity`.
    ///
    /// On `Err` nothing was persisted, so the caller may retry.
    pub async fn spin(&self, identity: &str) -> Result<SpinOutcome, StoreError> {
        let now = self.clock.now();

        let outcome = self
            .store
            .apply_spin_update(identity, now, move |account| spin_account(account, now))
            .await
            .inspect_err(|e| tracing::error!(identity, error = %e, "Spin failed"))?;

        match &outcome {
            SpinOutcome::Granted {
                reward_label,
                balance,
                spins_remaining,
                ..
            } => tracing::info!(
                identity,
                reward = reward_label,
                balance,
                spins_remaining,
                "Spin granted"
            ),
            SpinOutcome::NoSpinsLeft { .. } => {
                tracing::info!(identity, "Spin refused: daily quota exhausted")
            }
        }

        Ok(outcome)
    }
}

/// One spin against an account snapshot.
///
/// Rollover, quota check, decrement, and credit all mutate the same snapshot,
/// so the store persists them as one write.
fn spin_account(account: &mut Account, now: chrono::DateTime<chrono::Utc>) -> SpinOutcome {
    if account.rollover_due(now) {
        account.rollover(now);
    }

    let reward = draw_reward(&mut rand::thread_rng());
    if !account.consume_spin(reward, now) {
        return SpinOutcome::NoSpinsLeft {
            spins_remaining: account.spins_remaining,
        };
    }

    SpinOutcome::Granted {
        reward_label: reward.label,
        reward_value: reward.value,
        balance: account.balance,
        spins_remaining: account.spins_remaining,
    }
}
