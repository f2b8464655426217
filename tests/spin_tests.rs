// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Spin engine scenarios and concurrency properties.

use chrono::Duration;
use spin_rewards::db::AccountStore;
use spin_rewards::error::StoreError;
use spin_rewards::models::{Account, DAILY_SPIN_ALLOTMENT, REWARD_TABLE};
use spin_rewards::services::{ResetScheduler, SpinEngine, SpinOutcome};
use spin_rewards::time_utils::ManualClock;
use std::sync::Arc;

mod common;
use common::today;

const NUM_CONCURRENT_SPINS: usize = 10;

fn engine() -> (SpinEngine, AccountStore, Arc<ManualClock>) {
    let store = AccountStore::new_in_memory();
    let clock = Arc::new(ManualClock::new(today()));
    (SpinEngine::new(store.clone(), clock.clone()), store, clock)
}

fn reward_value(label: &str) -> f64 {
    REWARD_TABLE
        .iter()
        .find(|r| r.label == label)
        .map(|r| r.value)
        .expect("label from reward table")
}

#[tokio::test]
async fn test_fresh_identity_spins_once() {
    let (engine, store, _) = engine();

    let outcome = engine.spin("u1").await.unwrap();

    let SpinOutcome::Granted {
        reward_label,
        reward_value: value,
        balance,
        spins_remaining,
    } = outcome
    else {
        panic!("expected grant, got {:?}", outcome);
    };

    assert_eq!(spins_remaining, 2);
    assert!([0.0, 0.001, 0.1, 5.0].contains(&value));
    assert_eq!(value, reward_value(reward_label));
    assert_eq!(balance, value);

    let account = store.get("u1").await.unwrap().unwrap();
    assert_eq!(account.spins_remaining, 2);
    assert_eq!(account.last_spin_date, Some(today()));
    if value > 0.0 {
        assert_eq!(account.reward_history, vec![reward_label.to_string()]);
    } else {
        assert!(account.reward_history.is_empty());
    }
}

#[tokio::test]
async fn test_first_spin_stamps_creation_from_clock() {
    let (engine, store, clock) = engine();
    clock.advance(Duration::hours(3));

    engine.spin("fresh").await.unwrap();

    let account = store.get("fresh").await.unwrap().unwrap();
    assert_eq!(account.created_at, today() + Duration::hours(3));
    assert_eq!(account.last_spin_date, Some(account.created_at));
}

#[tokio::test]
async fn test_exhausted_today_changes_nothing() {
    let (engine, store, _) = engine();
    let mut account = Account::new("u2", today() - Duration::days(10));
    account.spins_remaining = 0;
    account.last_spin_date = Some(today() - Duration::hours(1));
    account.balance = 0.1;
    account.reward_history = vec!["0.1 TON".to_string()];
    store.put(&account).await.unwrap();

    let outcome = engine.spin("u2").await.unwrap();

    assert_eq!(outcome, SpinOutcome::NoSpinsLeft { spins_remaining: 0 });
    assert_eq!(store.get("u2").await.unwrap(), Some(account));
}

#[tokio::test]
async fn test_yesterday_exhausted_rolls_over() {
    let (engine, store, _) = engine();
    let mut account = Account::new("u3", today() - Duration::days(3));
    account.spins_remaining = 0;
    account.last_spin_date = Some(today() - Duration::days(1));
    store.put(&account).await.unwrap();

    let outcome = engine.spin("u3").await.unwrap();

    assert!(matches!(
        outcome,
        SpinOutcome::Granted {
            spins_remaining: 2,
            ..
        }
    ));
    let stored = store.get("u3").await.unwrap().unwrap();
    assert_eq!(stored.spins_remaining, 2);
    assert_eq!(stored.last_spin_date, Some(today()));
}

#[tokio::test]
async fn test_rollover_at_utc_midnight() {
    let (engine, store, clock) = engine();
    clock.set(today().date_naive().and_hms_opt(23, 59, 59).unwrap().and_utc());

    for _ in 0..DAILY_SPIN_ALLOTMENT {
        engine.spin("night").await.unwrap();
    }
    assert!(matches!(
        engine.spin("night").await.unwrap(),
        SpinOutcome::NoSpinsLeft { .. }
    ));

    clock.advance(Duration::seconds(1));
    assert!(matches!(
        engine.spin("night").await.unwrap(),
        SpinOutcome::Granted {
            spins_remaining: 2,
            ..
        }
    ));
    assert_eq!(store.get("night").await.unwrap().unwrap().spins_remaining, 2);
}

#[tokio::test]
async fn test_balance_matches_history() {
    let (engine, store, clock) = engine();
    let mut granted_total = 0.0;

    for day in 0..5 {
        clock.set(today() + Duration::days(day));
        for _ in 0..DAILY_SPIN_ALLOTMENT {
            if let SpinOutcome::Granted { reward_value, .. } = engine.spin("steady").await.unwrap() {
                granted_total += reward_value;
            }
        }
    }

    let account = store.get("steady").await.unwrap().unwrap();
    let history_total: f64 = account.reward_history.iter().map(|l| reward_value(l)).sum();
    assert!((account.balance - granted_total).abs() < 1e-9);
    assert!((account.balance - history_total).abs() < 1e-9);
    assert!(account.reward_history.iter().all(|l| reward_value(l) > 0.0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_spins_never_exceed_quota() {
    let (engine, store, _) = engine();
    let mut account = Account::new("race", today() - Duration::days(2));
    account.spins_remaining = 0;
    account.last_spin_date = Some(today() - Duration::days(1));
    store.put(&account).await.unwrap();

    let mut handles = vec![];
    for _ in 0..NUM_CONCURRENT_SPINS {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move { engine.spin("race").await }));
    }

    let mut granted = 0;
    let mut refused = 0;
    let mut granted_total = 0.0;
    for handle in handles {
        match handle.await.expect("Task join failed").expect("Spin failed") {
            SpinOutcome::Granted { reward_value, .. } => {
                granted += 1;
                granted_total += reward_value;
            }
            SpinOutcome::NoSpinsLeft { spins_remaining } => {
                assert_eq!(spins_remaining, 0);
                refused += 1;
            }
        }
    }

    assert_eq!(granted, DAILY_SPIN_ALLOTMENT as usize);
    assert_eq!(refused, NUM_CONCURRENT_SPINS - DAILY_SPIN_ALLOTMENT as usize);

    let stored = store.get("race").await.unwrap().unwrap();
    assert_eq!(stored.spins_remaining, 0);
    assert!((stored.balance - granted_total).abs() < 1e-9);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_contact_creates_single_account() {
    let store = AccountStore::new_in_memory();

    let mut handles = vec![];
    for _ in 0..NUM_CONCURRENT_SPINS {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.get_or_create("new", chrono::Utc::now()).await
        }));
    }

    let mut created_at = None;
    for handle in handles {
        let account = handle.await.unwrap().unwrap();
        assert_eq!(account.spins_remaining, DAILY_SPIN_ALLOTMENT);
        // Every caller sees the same record
        assert_eq!(*created_at.get_or_insert(account.created_at), account.created_at);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_reset_racing_spin_leaves_valid_state() {
    for _ in 0..50 {
        let (engine, store, clock) = engine();
        let reset = ResetScheduler::new(store.clone(), clock.clone());

        let mut account = Account::new("u4", today());
        account.spins_remaining = 1;
        account.last_spin_date = Some(today());
        store.put(&account).await.unwrap();

        let spin = tokio::spawn({
            let engine = engine.clone();
            async move { engine.spin("u4").await }
        });
        let bulk = tokio::spawn(async move { reset.run_once().await });

        let outcome = spin.await.unwrap().unwrap();
        assert_eq!(bulk.await.unwrap().unwrap(), 1);

        let stored = store.get("u4").await.unwrap().unwrap();
        let SpinOutcome::Granted { balance, .. } = outcome else {
            panic!("spin with one spin left must be granted");
        };

        // Balance from the grant survives regardless of ordering
        assert_eq!(stored.balance, balance);
        assert_eq!(stored.last_spin_date, Some(today()));
        // Spin then reset: full allotment. Reset then spin: allotment minus one.
        assert!(
            stored.spins_remaining == DAILY_SPIN_ALLOTMENT
                || stored.spins_remaining == DAILY_SPIN_ALLOTMENT - 1,
            "torn quota: {}",
            stored.spins_remaining
        );
    }
}

#[tokio::test]
async fn test_store_failure_surfaces_as_error() {
    let clock = Arc::new(ManualClock::new(today()));
    let engine = SpinEngine::new(AccountStore::new_mock(), clock);

    assert!(matches!(
        engine.spin("u5").await,
        Err(StoreError::Unreachable(_))
    ));
}
