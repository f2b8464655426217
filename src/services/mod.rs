// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod bot;
pub mod scheduler;
pub mod spin;
pub mod verifier;

pub use bot::{BotCommand, BotReply, CommandHandler};
pub use scheduler::{ResetScheduler, SchedulerHandle};
pub use spin::{SpinEngine, SpinOutcome};
pub use verifier::PayloadVerifier;
