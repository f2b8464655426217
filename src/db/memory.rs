// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory account backend for local development and tests.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;

use crate::models::Account;

/// Accounts held in a sharded concurrent map.
///
/// Each update runs while holding the entry's shard lock, which gives the
/// same per-account atomicity the Firestore transaction provides.
#[derive(Clone, Default)]
pub struct MemoryAccounts {
    accounts: Arc<DashMap<String, Account>>,
}

impl MemoryAccounts {
    pub fn get(&self, identity: &str) -> Option<Account> {
        self.accounts.get(identity).map(|entry| entry.clone())
    }

    pub fn update<F, T>(&self, identity: &str, now: DateTime<Utc>, mutate: F) -> T
    where
        F: Fn(&mut Account) -> T,
    {
        let mut entry = self
            .accounts
            .entry(identity.to_string())
            .or_insert_with(|| Account::new(identity, now));
        mutate(entry.value_mut())
    }

    pub fn reset_all(&self, allotment: u32, timestamp: DateTime<Utc>) -> usize {
        let mut count = 0;
        for mut entry in self.accounts.iter_mut() {
            let account = entry.value_mut();
            account.spins_remaining = allotment;
            account.last_spin_date = Some(timestamp);
            count += 1;
        }
        count
    }

    pub fn put(&self, account: Account) {
        self.accounts.insert(account.identity.clone(), account);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_all_keeps_balance_and_history() {
        let mem = MemoryAccounts::default();
        let mut account = Account::new("a", Utc::now());
        account.spins_remaining = 0;
        account.balance = 5.1;
        account.reward_history = vec!["5 TON".into(), "0.1 TON".into()];
        mem.put(account);
        mem.update("b", Utc::now(), |_| ());

        let ts = Utc::now();
        assert_eq!(mem.reset_all(3, ts), 2);

        let a = mem.get("a").unwrap();
        assert_eq!(a.spins_remaining, 3);
        assert_eq!(a.last_spin_date, Some(ts));
        assert_eq!(a.balance, 5.1);
        assert_eq!(a.reward_history.len(), 2);
    }

    #[test]
    fn test_concurrent_first_contact_creates_one_account() {
        let mem = MemoryAccounts::default();

        let granted: usize = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    s.spawn(|| {
                        mem.update("same", Utc::now(), |a| {
                            if a.spins_remaining > 0 {
                                a.spins_remaining -= 1;
                                true
                            } else {
                                false
                            }
                        })
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or(false))
                .filter(|granted| *granted)
                .count()
        });

        assert_eq!(mem.accounts.len(), 1);
        assert_eq!(granted, 3);
        assert_eq!(mem.get("same").unwrap().spins_remaining, 0);
    }
}
