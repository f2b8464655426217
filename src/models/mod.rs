// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod account;
pub mod reward;

pub use account::{Account, DAILY_SPIN_ALLOTMENT};
pub use reward::{draw_reward, Reward, REWARD_TABLE};
