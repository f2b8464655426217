// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account persistence.
//!
//! `AccountStore` is the only path to account state. Every backend provides
//! an atomic per-account read-modify-write, so concurrent requests for the
//! same identity serialize here rather than in the engine.

pub mod firestore;
pub mod memory;

use chrono::{DateTime, Utc};

use crate::config::StoreBackend;
use crate::error::StoreError;
use crate::models::Account;

pub use self::firestore::FirestoreAccounts;
pub use self::memory::MemoryAccounts;

/// Collection names as constants.
pub mod collections {
    pub const ACCOUNTS: &str = "accounts";
}

#[derive(Clone)]
enum Backend {
    Firestore(FirestoreAccounts),
    Memory(MemoryAccounts),
    Offline,
}

/// Durable per-identity account state.
#[derive(Clone)]
pub struct AccountStore {
    backend: Backend,
}

impl AccountStore {
    /// Connect to the configured backend.
    pub async fn connect(backend: &StoreBackend) -> Result<Self, StoreError> {
        match backend {
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory account store; state is lost on restart");
                Ok(Self::new_in_memory())
            }
            StoreBackend::Firestore { project_id } => Ok(Self {
                backend: Backend::Firestore(FirestoreAccounts::new(project_id).await?),
            }),
        }
    }

    /// Create a process-local store.
    pub fn new_in_memory() -> Self {
        Self {
            backend: Backend::Memory(MemoryAccounts::default()),
        }
    }

    /// Create a store with no backing database.
    ///
    /// All operations fail with `StoreError::Unreachable`.
    pub fn new_mock() -> Self {
        Self {
            backend: Backend::Offline,
        }
    }

    fn offline() -> StoreError {
        StoreError::Unreachable("Database not connected (offline mode)".to_string())
    }

    /// Fetch an account without creating it.
    pub async fn get(&self, identity: &str) -> Result<Option<Account>, StoreError> {
        match &self.backend {
            Backend::Firestore(db) => db.get(identity).await,
            Backend::Memory(mem) => Ok(mem.get(identity)),
            Backend::Offline => Err(Self::offline()),
        }
    }

    /// Return the account for `identity`, creating the default one if absent.
    ///
    /// Concurrent first contact from the same identity yields a single account.
    /// A new account records `now` as its creation time.
    pub async fn get_or_create(
        &self,
        identity: &str,
        now: DateTime<Utc>,
    ) -> Result<Account, StoreError> {
        self.apply_spin_update(identity, now, |account| account.clone())
            .await
    }

    /// Atomically read, mutate, and persist one account.
    ///
    /// `mutate` may run more than once if a backend retries on contention; only
    /// the run that commits is observable. A missing account is created with
    /// defaults first, stamped with `now`. Nothing is written when `mutate`
    /// leaves an existing account unchanged.
    pub async fn apply_spin_update<F, T>(
        &self,
        identity: &str,
        now: DateTime<Utc>,
        mutate: F,
    ) -> Result<T, StoreError>
    where
        F: Fn(&mut Account) -> T + Send + Sync + 'static,
        T: Send + 'static,
    {
        match &self.backend {
            Backend::Firestore(db) => db.update(identity, now, mutate).await,
            Backend::Memory(mem) => Ok(mem.update(identity, now, mutate)),
            Backend::Offline => Err(Self::offline()),
        }
    }

    /// Set every account's quota to `allotment`, stamped with `timestamp`.
    ///
    /// Balance and history are never touched. Returns the number of accounts reset.
    pub async fn reset_all(
        &self,
        allotment: u32,
        timestamp: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        match &self.backend {
            Backend::Firestore(db) => db.reset_all(allotment, timestamp).await,
            Backend::Memory(mem) => Ok(mem.reset_all(allotment, timestamp)),
            Backend::Offline => Err(Self::offline()),
        }
    }

    /// Overwrite an account document. Administrative seeding only.
    pub async fn put(&self, account: &Account) -> Result<(), StoreError> {
        match &self.backend {
            Backend::Firestore(db) => db.put(account).await,
            Backend::Memory(mem) => {
                mem.put(account.clone());
                Ok(())
            }
            Backend::Offline => Err(Self::offline()),
        }
    }
}
