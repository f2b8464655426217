// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Chat command handling for the bot.
//!
//! The platform authenticates command senders itself, so commands are keyed
//! directly by the sender's user ID and go through the same `AccountStore`
//! operations as the mini-app.

use std::sync::Arc;

use crate::db::AccountStore;
use crate::error::StoreError;
use crate::time_utils::Clock;

/// Number of recent rewards listed by `/balance`.
const HISTORY_PREVIEW: usize = 5;

/// Commands the bot understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Balance,
    Help,
}

impl BotCommand {
    /// Parse a message like `/start`, `/balance@SpinBot`, or `/help extra words`.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?;
        let command = word.strip_prefix('/')?;
        let command = command.split('@').next().unwrap_or(command);

        match command.to_ascii_lowercase().as_str() {
            "start" => Some(BotCommand::Start),
            "balance" => Some(BotCommand::Balance),
            "help" => Some(BotCommand::Help),
            _ => None,
        }
    }
}

/// Reply to send back to the chat.
#[derive(Debug, Clone, PartialEq)]
pub struct BotReply {
    pub text: String,
    /// Label and URL of a button that opens the mini-app.
    pub web_app_button: Option<(String, String)>,
}

/// Answers bot commands against the account store.
#[derive(Clone)]
pub struct CommandHandler {
    store: AccountStore,
    clock: Arc<dyn Clock>,
    web_app_url: String,
}

impl CommandHandler {
    pub fn new(store: AccountStore, clock: Arc<dyn Clock>, web_app_url: String) -> Self {
        Self {
            store,
            clock,
            web_app_url,
        }
    }

    pub async fn handle(
        &self,
        identity: &str,
        first_name: Option<&str>,
        command: BotCommand,
    ) -> Result<BotReply, StoreError> {
        tracing::debug!(identity, ?command, "Handling bot command");

        match command {
            BotCommand::Start => {
                let account = self.store.get_or_create(identity, self.clock.now()).await?;
                let greeting = match first_name {
                    Some(name) if !name.trim().is_empty() => format!("Welcome, {}!", name.trim()),
                    _ => "Welcome!".to_string(),
                };
                Ok(BotReply {
                    text: format!(
                        "{}\n\nYou have {} spins today. Tap the button below to spin the wheel.",
                        greeting,
                        account.effective_spins(self.clock.now())
                    ),
                    web_app_button: Some(("Spin the wheel".to_string(), self.web_app_url.clone())),
                })
            }
            BotCommand::Balance => {
                let account = self.store.get_or_create(identity, self.clock.now()).await?;
                let mut text = format!(
                    "Balance: {}\nSpins left today: {}",
                    format_amount(account.balance),
                    account.effective_spins(self.clock.now())
                );

                if account.reward_history.is_empty() {
                    text.push_str("\nNo rewards yet.");
                } else {
                    text.push_str("\nRecent rewards:");
                    for label in account.reward_history.iter().rev().take(HISTORY_PREVIEW) {
                        text.push_str("\n• ");
                        text.push_str(label);
                    }
                }

                Ok(BotReply {
                    text,
                    web_app_button: None,
                })
            }
            BotCommand::Help => Ok(BotReply {
                text: [
                    "/start - open the spin wheel",
                    "/balance - show your balance and rewards",
                    "/help - show this message",
                ]
                .join("\n"),
                web_app_button: None,
            }),
        }
    }
}

/// Render a balance without float noise (e.g. `5.101`, not `5.101000000000001`).
pub fn format_amount(value: f64) -> String {
    let rendered = format!("{:.3}", value);
    let trimmed = rendered.trim_end_matches('0').trim_end_matches('.');
    format!("{} TON", trimmed)
}
