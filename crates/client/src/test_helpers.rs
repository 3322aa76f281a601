// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Test doubles shared across module tests.

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};
use till_core::{ClockSource, Token};

use crate::auth::{RefreshError, RefreshFuture, TokenConfig, TokenManager, TokenRefresher};
use crate::http::{ApiError, ApiRequest, ApiResponse, BackendFuture, HttpBackend};

/// Far enough in the future that no test sees it expire.
pub const FAR_FUTURE_SECS: u64 = 4_000_000_000;

/// A manually advanced wall clock.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    pub fn at_secs(secs: u64) -> Arc<Self> {
        Arc::new(ManualClock {
            now_ms: AtomicU64::new(secs * 1000),
        })
    }

    pub fn advance(&self, by: Duration) {
        self.now_ms.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl ClockSource for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// Wall clock that follows tokio's (pausable) clock.
#[derive(Debug)]
pub struct TokioClock {
    base_ms: u64,
    start: tokio::time::Instant,
}

impl TokioClock {
    pub fn at_secs(secs: u64) -> Arc<Self> {
        Arc::new(TokioClock {
            base_ms: secs * 1000,
            start: tokio::time::Instant::now(),
        })
    }
}

impl ClockSource for TokioClock {
    fn now_ms(&self) -> u64 {
        self.base_ms + self.start.elapsed().as_millis() as u64
    }
}

/// Scripted reply for one backend call.
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16, Value),
    NetworkError(String),
    /// Sleep before answering with the inner reply.
    Delayed(Duration, Box<Reply>),
}

#[derive(Default)]
struct BackendState {
    accepted: HashSet<String>,
    scripts: HashMap<String, VecDeque<Reply>>,
    calls: Vec<(String, String, Option<String>)>,
}

/// Backend that answers `401` to unknown tokens and otherwise plays
/// per-path scripts, defaulting to `200 {"ok": true}`.
#[derive(Default)]
pub struct MockBackend {
    state: Mutex<BackendState>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn accept(&self, token: &str) {
        self.state.lock().unwrap().accepted.insert(token.to_string());
    }

    pub fn revoke(&self, token: &str) {
        self.state.lock().unwrap().accepted.remove(token);
    }

    pub fn script(&self, path: &str, reply: Reply) {
        self.state
            .lock()
            .unwrap()
            .scripts
            .entry(path.to_string())
            .or_default()
            .push_back(reply);
    }

    /// `(path, token)` of every call in order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .map(|(p, t, _)| (p.clone(), t.clone()))
            .collect()
    }

    /// Paths of calls that carried an accepted token, in order.
    pub fn accepted_paths(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .calls
            .iter()
            .filter(|(_, t, _)| state.accepted.contains(t))
            .map(|(p, _, _)| p.clone())
            .collect()
    }

    pub fn idempotency_keys(&self) -> Vec<Option<String>> {
        self.state.lock().unwrap().calls.iter().map(|(_, _, k)| k.clone()).collect()
    }
}

impl HttpBackend for MockBackend {
    fn send<'a>(&'a self, request: &'a ApiRequest, access_token: &'a str) -> BackendFuture<'a> {
        Box::pin(async move {
            let reply = {
                let mut state = self.state.lock().unwrap();
                state.calls.push((
                    request.path.clone(),
                    access_token.to_string(),
                    request.idempotency_key.clone(),
                ));
                if !state.accepted.contains(access_token) {
                    Reply::Status(401, json!({"message": "unauthorized"}))
                } else {
                    state
                        .scripts
                        .get_mut(&request.path)
                        .and_then(VecDeque::pop_front)
                        .unwrap_or_else(|| Reply::Status(200, json!({"ok": true})))
                }
            };
            play(reply).await
        })
    }
}

fn play(reply: Reply) -> BackendFuture<'static> {
    Box::pin(async move {
        match reply {
            Reply::Status(status, body) => Ok(ApiResponse::new(status, body)),
            Reply::NetworkError(msg) => Err(ApiError::Network(msg)),
            Reply::Delayed(delay, inner) => {
                tokio::time::sleep(delay).await;
                play(*inner).await
            }
        }
    })
}

/// Refresher issuing `access-N` tokens, optionally after a delay.
pub struct MockRefresher {
    calls: AtomicUsize,
    delay: Duration,
    expires_at: u64,
    failures: Mutex<VecDeque<RefreshError>>,
    backend: Option<Arc<MockBackend>>,
}

impl MockRefresher {
    pub fn new() -> Self {
        MockRefresher {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            expires_at: FAR_FUTURE_SECS,
            failures: Mutex::new(VecDeque::new()),
            backend: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_expiry(mut self, expires_at: u64) -> Self {
        self.expires_at = expires_at;
        self
    }

    /// Registers every issued token as accepted by `backend`.
    pub fn issuing_for(mut self, backend: &Arc<MockBackend>) -> Self {
        self.backend = Some(Arc::clone(backend));
        self
    }

    pub fn fail_next(&self, err: RefreshError) {
        self.failures.lock().unwrap().push_back(err);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TokenRefresher for MockRefresher {
    fn refresh<'a>(&'a self, _refresh_token: &'a str) -> RefreshFuture<'a> {
        Box::pin(async move {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if let Some(err) = self.failures.lock().unwrap().pop_front() {
                return Err(err);
            }
            let token = Token::new(format!("access-{n}"), format!("refresh-{n}"), self.expires_at);
            if let Some(backend) = &self.backend {
                backend.accept(&token.access_token);
            }
            Ok(token)
        })
    }
}

/// Token manager with a session whose access token is `access-0`.
pub fn session_manager(refresher: Arc<MockRefresher>) -> TokenManager {
    let tokens = TokenManager::new(refresher, TokenConfig::default());
    tokens.set_session(Token::new("access-0", "refresh-0", FAR_FUTURE_SECS));
    tokens
}
