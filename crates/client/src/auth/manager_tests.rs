// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::join_all;
use till_core::Token;

use super::*;
use crate::events::{ClearReason, TokenEvent};
use crate::test_helpers::{session_manager, ManualClock, MockRefresher, FAR_FUTURE_SECS};

fn recorded_events(tokens: &TokenManager) -> Arc<Mutex<Vec<String>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    tokens.events().subscribe("test", move |e: &TokenEvent| {
        sink.lock().unwrap().push(e.name().to_string());
    });
    seen
}

#[tokio::test]
async fn get_token_without_session_fails() {
    let tokens = TokenManager::new(Arc::new(MockRefresher::new()), TokenConfig::default());
    assert_eq!(tokens.get_token_with_refresh().await, Err(AuthError::NoSession));
}

#[tokio::test]
async fn get_token_returns_current_token_when_valid() {
    let refresher = Arc::new(MockRefresher::new());
    let tokens = session_manager(Arc::clone(&refresher));

    assert_eq!(tokens.get_token_with_refresh().await.unwrap(), "access-0");
    assert_eq!(refresher.calls(), 0);
}

#[tokio::test]
async fn get_token_refreshes_inside_expiry_buffer() {
    let clock = ManualClock::at_secs(1_000);
    let refresher = Arc::new(MockRefresher::new());
    let tokens = TokenManager::with_clock(refresher.clone(), clock, TokenConfig::default());
    // Expires in 30s, inside the 60s buffer.
    tokens.set_session(Token::new("stale", "refresh-0", 1_030));

    assert_eq!(tokens.get_token_with_refresh().await.unwrap(), "access-1");
    assert_eq!(refresher.calls(), 1);
    assert_eq!(tokens.access_token().as_deref(), Some("access-1"));
}

#[tokio::test(start_paused = true)]
async fn concurrent_refreshes_share_one_call() {
    let refresher = Arc::new(MockRefresher::new().with_delay(Duration::from_millis(200)));
    let tokens = session_manager(Arc::clone(&refresher));
    let events = recorded_events(&tokens);

    let results = join_all((0..5).map(|_| tokens.refresh_auth_token())).await;

    assert_eq!(refresher.calls(), 1);
    assert_eq!(tokens.refresh_calls(), 1);
    assert!(results.iter().all(|r| r.as_deref() == Ok("access-1")));
    assert_eq!(*events.lock().unwrap(), vec!["token:refreshed"]);
    assert!(!tokens.is_refreshing());
}

#[tokio::test(start_paused = true)]
async fn sequential_refreshes_each_call_endpoint() {
    let refresher = Arc::new(MockRefresher::new());
    let tokens = session_manager(Arc::clone(&refresher));

    assert_eq!(tokens.refresh_auth_token().await.unwrap(), "access-1");
    assert_eq!(tokens.refresh_auth_token().await.unwrap(), "access-2");
    assert_eq!(refresher.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn refresh_settles_when_callers_are_cancelled() {
    let refresher = Arc::new(MockRefresher::new().with_delay(Duration::from_millis(200)));
    let tokens = session_manager(Arc::clone(&refresher));

    let abandoned = tokio::time::timeout(Duration::from_millis(50), tokens.refresh_auth_token()).await;
    assert!(abandoned.is_err());

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(tokens.access_token().as_deref(), Some("access-1"));
    assert!(!tokens.is_refreshing());
}

#[tokio::test(start_paused = true)]
async fn rejected_refresh_clears_session() {
    let refresher = Arc::new(MockRefresher::new());
    refresher.fail_next(RefreshError::Rejected("revoked".to_string()));
    let tokens = session_manager(Arc::clone(&refresher));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    tokens.events().subscribe("test", move |e: &TokenEvent| {
        sink.lock().unwrap().push(e.clone());
    });

    let result = tokens.refresh_auth_token().await;

    assert_eq!(result, Err(AuthError::Terminal("revoked".to_string())));
    assert!(!tokens.has_session());
    assert_eq!(
        *seen.lock().unwrap(),
        vec![TokenEvent::Cleared(ClearReason::RefreshRejected)]
    );
}

#[tokio::test(start_paused = true)]
async fn network_refresh_failure_keeps_session() {
    let refresher = Arc::new(MockRefresher::new());
    refresher.fail_next(RefreshError::Network("connection reset".to_string()));
    let tokens = session_manager(Arc::clone(&refresher));

    let result = tokens.refresh_auth_token().await;

    assert!(matches!(result, Err(AuthError::Network(_))));
    assert_eq!(tokens.access_token().as_deref(), Some("access-0"));
    // The next attempt goes through; the failed call still used a number.
    assert_eq!(tokens.refresh_auth_token().await.unwrap(), "access-2");
    assert_eq!(tokens.access_token().as_deref(), Some("access-2"));
    assert_eq!(refresher.calls(), 2);
}

#[test]
fn expiry_verdict_is_cached_for_ttl() {
    let clock = ManualClock::at_secs(1_000);
    let tokens = TokenManager::with_clock(
        Arc::new(MockRefresher::new()),
        clock.clone(),
        TokenConfig::default(),
    );
    // Valid until 1_062 - 60s buffer = 1_002.
    tokens.set_session(Token::new("a", "r", 1_062));
    assert!(!tokens.is_token_expired());

    // Past the buffer, but the cached verdict is still inside its 5s TTL.
    clock.advance(Duration::from_secs(4));
    assert!(!tokens.is_token_expired());

    clock.advance(Duration::from_secs(40));
    assert!(tokens.is_token_expired());
}

#[test]
fn expiry_cache_recomputes_after_ttl() {
    let clock = ManualClock::at_secs(1_000);
    let tokens = TokenManager::with_clock(
        Arc::new(MockRefresher::new()),
        clock.clone(),
        TokenConfig::default(),
    );
    tokens.set_session(Token::new("a", "r", 1_063));
    assert!(!tokens.is_token_expired());

    // 1_004 + 60 >= 1_063, but the 1_000 verdict is reused.
    clock.advance(Duration::from_millis(4_999));
    assert!(!tokens.is_token_expired());

    clock.advance(Duration::from_millis(1));
    assert!(tokens.is_token_expired());
}

#[test]
fn new_session_invalidates_cached_verdict() {
    let clock = ManualClock::at_secs(1_000);
    let tokens = TokenManager::with_clock(
        Arc::new(MockRefresher::new()),
        clock,
        TokenConfig::default(),
    );
    tokens.set_session(Token::new("old", "r", 1_010));
    assert!(tokens.is_token_expired());

    tokens.set_session(Token::new("new", "r", FAR_FUTURE_SECS));
    assert!(!tokens.is_token_expired());
}

#[test]
fn clear_invalidates_and_emits_once() {
    let tokens = session_manager(Arc::new(MockRefresher::new()));
    let events = recorded_events(&tokens);
    assert!(!tokens.is_token_expired());

    tokens.clear();
    tokens.clear();

    assert!(tokens.is_token_expired());
    assert_eq!(*events.lock().unwrap(), vec!["token:cleared"]);
}

#[test]
fn set_session_emits_established() {
    let tokens = TokenManager::new(Arc::new(MockRefresher::new()), TokenConfig::default());
    let events = recorded_events(&tokens);

    tokens.set_session(Token::new("a", "r", FAR_FUTURE_SECS));

    assert_eq!(*events.lock().unwrap(), vec!["token:established"]);
    assert_eq!(tokens.access_token().as_deref(), Some("a"));
}

#[tokio::test(start_paused = true)]
async fn expired_token_refreshes_once_for_concurrent_callers() {
    let clock = ManualClock::at_secs(1_000);
    let refresher = Arc::new(MockRefresher::new().with_delay(Duration::from_millis(200)));
    let tokens = TokenManager::with_clock(refresher.clone(), clock, TokenConfig::default());
    tokens.set_session(Token::new("stale", "refresh-0", 1_010));

    let results = join_all((0..3).map(|_| tokens.get_token_with_refresh())).await;

    assert!(results.iter().all(|r| r.as_deref() == Ok("access-1")));
    assert_eq!(refresher.calls(), 1);
}
