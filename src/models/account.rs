// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-user account model: daily spin quota, balance, and reward history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::reward::Reward;
use crate::time_utils::same_utc_day;

/// Spins granted per UTC day.
pub const DAILY_SPIN_ALLOTMENT: u32 = 3;

/// Account document, keyed by the caller's platform identity.
///
/// Stored at: `accounts/{identity}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Platform user ID (also used as document ID)
    pub identity: String,
    /// Spins left for the current day
    pub spins_remaining: u32,
    /// Accumulated reward value
    #[serde(default)]
    pub balance: f64,
    /// Labels of granted rewards, oldest first
    #[serde(default)]
    pub reward_history: Vec<String>,
    /// Last time the quota was evaluated (spin or global reset)
    #[serde(default)]
    pub last_spin_date: Option<DateTime<Utc>>,
    /// When the account was first seen
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// A fresh account with the full daily allotment and no history.
    pub fn new(identity: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            identity: identity.into(),
            spins_remaining: DAILY_SPIN_ALLOTMENT,
            balance: 0.0,
            reward_history: Vec::new(),
            last_spin_date: None,
            created_at,
        }
    }

    /// Whether the quota is due for a rollover at `now`.
    pub fn rollover_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_spin_date {
            Some(last) => !same_utc_day(last, now),
            None => true,
        }
    }

    /// Spins available at `now`, counting a pending rollover.
    pub fn effective_spins(&self, now: DateTime<Utc>) -> u32 {
        if self.rollover_due(now) {
            DAILY_SPIN_ALLOTMENT
        } else {
            self.spins_remaining
        }
    }

    /// Re-arm the quota for a new day.
    pub fn rollover(&mut self, now: DateTime<Utc>) {
        self.spins_remaining = DAILY_SPIN_ALLOTMENT;
        self.last_spin_date = Some(now);
    }

    /// Consume one spin and credit `reward`.
    ///
    /// Returns `false` without touching any field if no spins are left.
    pub fn consume_spin(&mut self, reward: &Reward, now: DateTime<Utc>) -> bool {
        if self.spins_remaining == 0 {
            return false;
        }

        self.spins_remaining -= 1;
        self.last_spin_date = Some(now);

        if reward.value > 0.0 {
            self.balance += reward.value;
            self.reward_history.push(reward.label.to_string());
        }

        true
    }
}
