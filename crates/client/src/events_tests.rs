// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};

fn counting_listener(counter: &Arc<AtomicUsize>) -> impl Fn(&TokenEvent) + Send + Sync + 'static {
    let counter = Arc::clone(counter);
    move |_event: &TokenEvent| {
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn event_names() {
    let token = Token::new("a", "r", 1);
    assert_eq!(TokenEvent::Established(token.clone()).name(), "token:established");
    assert_eq!(TokenEvent::Refreshed(token).name(), "token:refreshed");
    assert_eq!(TokenEvent::Cleared(ClearReason::Logout).name(), "token:cleared");
}

#[test]
fn duplicate_key_registration_is_ignored() {
    let bus = EventBus::new();
    let counter = Arc::new(AtomicUsize::new(0));

    assert!(bus.subscribe("session-restore", counting_listener(&counter)));
    assert!(!bus.subscribe("session-restore", counting_listener(&counter)));
    assert_eq!(bus.listener_count(), 1);

    bus.emit(&TokenEvent::Cleared(ClearReason::Logout));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn distinct_keys_all_receive_events() {
    let bus = EventBus::new();
    let counter = Arc::new(AtomicUsize::new(0));

    bus.subscribe("a", counting_listener(&counter));
    bus.subscribe("b", counting_listener(&counter));
    bus.emit(&TokenEvent::Cleared(ClearReason::RefreshRejected));

    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn unsubscribe_stops_delivery() {
    let bus = EventBus::new();
    let counter = Arc::new(AtomicUsize::new(0));

    bus.subscribe("a", counting_listener(&counter));
    assert!(bus.is_subscribed("a"));
    assert!(bus.unsubscribe("a"));
    assert!(!bus.unsubscribe("a"));

    bus.emit(&TokenEvent::Cleared(ClearReason::Logout));
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[test]
fn listener_may_subscribe_reentrantly() {
    let bus = Arc::new(EventBus::<TokenEvent>::new());
    let inner_bus = Arc::clone(&bus);

    bus.subscribe("outer", move |_| {
        inner_bus.subscribe("inner", |_| {});
    });
    bus.emit(&TokenEvent::Cleared(ClearReason::Logout));

    assert!(bus.is_subscribed("inner"));
}
