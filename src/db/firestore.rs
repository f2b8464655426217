// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore account backend.
//!
//! Per-account updates run inside `run_transaction`, which reads the account
//! document under the transaction and retries the whole closure when a
//! concurrent commit touched the same document. The global reset writes
//! only the quota fields, in batched transactions.

use chrono::{DateTime, Utc};
use firestore::errors::{BackoffError, FirestoreError};
use firestore::paths;
use firestore::FirestoreWritePrecondition;
use futures_util::{future, FutureExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::collections;
use crate::error::StoreError;
use crate::models::Account;

// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Projection used to list account IDs without loading history.
#[derive(Debug, Deserialize)]
struct AccountKey {
    identity: String,
}

/// Quota fields written by the global reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct QuotaPatch {
    spins_remaining: u32,
    last_spin_date: Option<DateTime<Utc>>,
}

/// Account collection in Firestore.
#[derive(Clone)]
pub struct FirestoreAccounts {
    client: firestore::FirestoreDb,
}

fn store_error(err: FirestoreError) -> StoreError {
    match &err {
        FirestoreError::DataConflictError(_) => StoreError::ConstraintViolation(err.to_string()),
        _ => StoreError::Unreachable(err.to_string()),
    }
}

impl FirestoreAccounts {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, StoreError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id).await.map_err(|e| {
            StoreError::Unreachable(format!("Failed to connect to Firestore: {}", e))
        })?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, StoreError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            StoreError::Unreachable(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }

    /// Get an account by identity.
    pub async fn get(&self, identity: &str) -> Result<Option<Account>, StoreError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::ACCOUNTS)
            .obj()
            .one(identity)
            .await
            .map_err(store_error)
    }

    /// Transactional read-modify-write of one account, creating it if absent.
    pub async fn update<F, T>(
        &self,
        identity: &str,
        now: DateTime<Utc>,
        mutate: F,
    ) -> Result<T, StoreError>
    where
        F: Fn(&mut Account) -> T + Send + Sync + 'static,
        T: Send + 'static,
    {
        let identity = identity.to_string();
        let mutate = Arc::new(mutate);

        self.client
            .run_transaction(move |db, transaction| {
                let identity = identity.clone();
                let mutate = Arc::clone(&mutate);

                async move {
                    // Read under the transaction so a concurrent commit forces a retry
                    let existing: Option<Account> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::ACCOUNTS)
                        .obj()
                        .one(&identity)
                        .await?;

                    let created = existing.is_none();
                    let mut account =
                        existing.unwrap_or_else(|| Account::new(identity.as_str(), now));
                    let before = account.clone();

                    let result = (*mutate)(&mut account);

                    if created || account != before {
                        db.fluent()
                            .update()
                            .in_col(collections::ACCOUNTS)
                            .document_id(&identity)
                            .object(&account)
                            .add_to_transaction(transaction)?;
                    }

                    Ok::<T, BackoffError<FirestoreError>>(result)
                }
                .boxed()
            })
            .await
            .map_err(store_error)
    }

    /// Re-arm the quota of every account.
    ///
    /// Only document IDs are listed up front, so reward history is never
    /// loaded.
    pub async fn reset_all(
        &self,
        allotment: u32,
        timestamp: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let keys: Vec<AccountKey> = self
            .client
            .fluent()
            .select()
            .fields(paths!(AccountKey::{identity}))
            .from(collections::ACCOUNTS)
            .obj()
            .query()
            .await
            .map_err(store_error)?;

        let ids: Vec<String> = keys.into_iter().map(|key| key.identity).collect();
        self.reset_accounts(&ids, allotment, timestamp).await
    }

    /// Re-arm the quota of the listed accounts, in batched transactions.
    ///
    /// Each batch re-reads its IDs inside the transaction, and IDs with no
    /// document are skipped rather than recreated. Returns the number of
    /// accounts written.
    pub async fn reset_accounts(
        &self,
        ids: &[String],
        allotment: u32,
        timestamp: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let patch = QuotaPatch {
            spins_remaining: allotment,
            last_spin_date: Some(timestamp),
        };
        let mut reset = 0;

        for chunk in ids.chunks(BATCH_SIZE) {
            let chunk = chunk.to_vec();
            let patch = patch.clone();
            let listed = chunk.len();

            let written = self
                .client
                .run_transaction(move |db, transaction| {
                    let chunk = chunk.clone();
                    let patch = patch.clone();

                    async move {
                        let present: Vec<String> = db
                            .fluent()
                            .select()
                            .fields(paths!(AccountKey::{identity}))
                            .by_id_in(collections::ACCOUNTS)
                            .obj::<AccountKey>()
                            .batch(chunk)
                            .await?
                            .filter_map(|(_, key)| future::ready(key.map(|k| k.identity)))
                            .collect()
                            .await;

                        // Field mask: balance and history written by concurrent spins survive
                        for identity in &present {
                            db.fluent()
                                .update()
                                .fields(paths!(QuotaPatch::{spins_remaining, last_spin_date}))
                                .in_col(collections::ACCOUNTS)
                                .precondition(FirestoreWritePrecondition::Exists(true))
                                .document_id(identity)
                                .object(&patch)
                                .add_to_transaction(&mut *transaction)?;
                        }

                        Ok::<usize, BackoffError<FirestoreError>>(present.len())
                    }
                    .boxed()
                })
                .await
                .map_err(store_error)?;

            if written < listed {
                tracing::debug!(
                    skipped = listed - written,
                    "Skipped accounts deleted before quota reset"
                );
            }
            tracing::debug!(count = written, "Committed quota reset batch");
            reset += written;
        }

        Ok(reset)
    }

    /// Overwrite an account document.
    pub async fn put(&self, account: &Account) -> Result<(), StoreError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::ACCOUNTS)
            .document_id(&account.identity)
            .object(account)
            .execute()
            .await
            .map_err(store_error)?;
        Ok(())
    }
}
