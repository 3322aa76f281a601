// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use super::*;

#[test]
fn update_reports_transitions_only() {
    let observer = NetworkObserver::new(ConnectionState::offline());

    assert!(observer.set_online("wifi"));
    assert!(!observer.set_online("wifi"));
    assert!(observer.set_online("cellular"));
    assert!(observer.set_offline());
    assert!(!observer.set_offline());
}

#[test]
fn subscribers_see_only_changes() {
    let observer = NetworkObserver::new(ConnectionState::offline());
    let mut rx = observer.subscribe();

    observer.set_offline();
    assert!(!rx.has_changed().unwrap());

    observer.set_online("wifi");
    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().network_type.as_deref(), Some("wifi"));
    assert!(observer.is_online());
}

#[tokio::test(start_paused = true)]
async fn wait_until_online_resolves_on_transition() {
    let observer = NetworkObserver::new(ConnectionState::offline());
    let mut rx = observer.subscribe();

    let waiter = tokio::spawn(async move { wait_until_online(&mut rx).await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!waiter.is_finished());

    observer.set_online("ethernet");
    assert!(waiter.await.unwrap());
}

#[tokio::test]
async fn wait_until_online_fails_when_observer_dropped() {
    let observer = NetworkObserver::new(ConnectionState::offline());
    let mut rx = observer.subscribe();
    drop(observer);

    assert!(!wait_until_online(&mut rx).await);
}
