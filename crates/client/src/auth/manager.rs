// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use till_core::{ClockSource, SystemClock, Token};
use tracing::{debug, info, warn};

use super::store::TokenStore;
use super::{AuthError, TokenRefresher};
use crate::events::{ClearReason, EventBus, TokenEvent};

/// Token timing knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenConfig {
    /// A token expiring within this window counts as expired.
    pub expiry_buffer: Duration,
    /// How long a validity verdict is reused.
    pub validity_ttl: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        TokenConfig {
            expiry_buffer: Duration::from_secs(60),
            validity_ttl: Duration::from_secs(5),
        }
    }
}

type SharedRefresh = Shared<BoxFuture<'static, Result<String, AuthError>>>;

struct Inner {
    config: TokenConfig,
    store: Mutex<TokenStore>,
    in_flight: Mutex<Option<SharedRefresh>>,
    refresher: Arc<dyn TokenRefresher>,
    clock: Arc<dyn ClockSource>,
    events: EventBus<TokenEvent>,
    refresh_calls: AtomicU64,
}

/// Owner of the session token.
///
/// Cloning is cheap; clones share the same session.
#[derive(Clone)]
pub struct TokenManager {
    inner: Arc<Inner>,
}

impl TokenManager {
    pub fn new(refresher: Arc<dyn TokenRefresher>, config: TokenConfig) -> Self {
        Self::with_clock(refresher, Arc::new(SystemClock), config)
    }

    pub fn with_clock(
        refresher: Arc<dyn TokenRefresher>,
        clock: Arc<dyn ClockSource>,
        config: TokenConfig,
    ) -> Self {
        TokenManager {
            inner: Arc::new(Inner {
                config,
                store: Mutex::new(TokenStore::default()),
                in_flight: Mutex::new(None),
                refresher,
                clock,
                events: EventBus::new(),
                refresh_calls: AtomicU64::new(0),
            }),
        }
    }

    pub fn events(&self) -> &EventBus<TokenEvent> {
        &self.inner.events
    }

    pub fn config(&self) -> &TokenConfig {
        &self.inner.config
    }

    /// Installs a session after login or restore.
    pub fn set_session(&self, token: Token) {
        self.inner.store().replace(token.clone());
        info!(expires_at = token.expires_at, "session established");
        self.inner.events.emit(&TokenEvent::Established(token));
    }

    /// Ends the session. Emits `token:cleared` only if a session existed.
    pub fn clear(&self) {
        let previous = self.inner.store().clear();
        if previous.is_some() {
            info!("session cleared");
            self.inner.events.emit(&TokenEvent::Cleared(ClearReason::Logout));
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.inner.store().token().map(|t| t.access_token.clone())
    }

    pub fn token(&self) -> Option<Token> {
        self.inner.store().token().cloned()
    }

    pub fn has_session(&self) -> bool {
        self.inner.store().token().is_some()
    }

    /// Returns true while a refresh call is outstanding.
    pub fn is_refreshing(&self) -> bool {
        self.inner.in_flight().is_some()
    }

    /// Number of refresh calls made to the refresh endpoint.
    pub fn refresh_calls(&self) -> u64 {
        self.inner.refresh_calls.load(Ordering::SeqCst)
    }

    /// Returns true if the access token is missing or expires within the
    /// configured buffer.
    ///
    /// The verdict is cached for the validity TTL; any token change
    /// invalidates it.
    pub fn is_token_expired(&self) -> bool {
        let now_ms = self.inner.clock.now_ms();
        let mut store = self.inner.store();
        if let Some(is_valid) = store.cached_validity(now_ms) {
            return !is_valid;
        }
        let buffer_secs = self.inner.config.expiry_buffer.as_secs();
        let is_valid = store
            .token()
            .is_some_and(|t| !t.expires_within(now_ms / 1000, buffer_secs));
        let ttl_ms = u64::try_from(self.inner.config.validity_ttl.as_millis()).unwrap_or(u64::MAX);
        store.cache_validity(is_valid, now_ms, ttl_ms);
        !is_valid
    }

    /// Returns a usable access token, refreshing first if it is missing or
    /// about to expire.
    pub async fn get_token_with_refresh(&self) -> Result<String, AuthError> {
        if !self.has_session() {
            return Err(AuthError::NoSession);
        }
        if self.is_token_expired() {
            debug!("access token within expiry buffer, refreshing");
            return self.refresh_auth_token().await;
        }
        self.access_token().ok_or(AuthError::NoSession)
    }

    /// Refreshes the token pair.
    ///
    /// Concurrent callers share one refresh call and observe the same
    /// outcome. The call runs on its own task, so it settles even if every
    /// caller is cancelled.
    pub async fn refresh_auth_token(&self) -> Result<String, AuthError> {
        let shared = {
            let mut slot = self.inner.in_flight();
            match slot.as_ref() {
                Some(pending) => {
                    debug!("joining in-flight refresh");
                    pending.clone()
                }
                None => {
                    // The task clears the slot when done and needs this lock
                    // to do so, so it cannot finish before the slot is set.
                    let task = tokio::spawn(Inner::run_refresh(Arc::clone(&self.inner)));
                    let inner = Arc::clone(&self.inner);
                    let pending = async move {
                        match task.await {
                            Ok(result) => result,
                            Err(e) => {
                                *inner.in_flight() = None;
                                Err(AuthError::Network(format!("refresh task failed: {e}")))
                            }
                        }
                    }
                    .boxed()
                    .shared();
                    *slot = Some(pending.clone());
                    pending
                }
            }
        };
        shared.await
    }
}

impl Inner {
    fn store(&self) -> std::sync::MutexGuard<'_, TokenStore> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn in_flight(&self) -> std::sync::MutexGuard<'_, Option<SharedRefresh>> {
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn run_refresh(self: Arc<Self>) -> Result<String, AuthError> {
        let outcome = self.refresh_once().await;
        *self.in_flight() = None;
        outcome
    }

    async fn refresh_once(&self) -> Result<String, AuthError> {
        let refresh_token = self.store().token().map(|t| t.refresh_token.clone());
        let Some(refresh_token) = refresh_token else {
            return Err(AuthError::NoSession);
        };

        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        info!("refreshing access token");
        match self.refresher.refresh(&refresh_token).await {
            Ok(token) => {
                let access = token.access_token.clone();
                self.store().replace(token.clone());
                info!(expires_at = token.expires_at, "access token refreshed");
                self.events.emit(&TokenEvent::Refreshed(token));
                Ok(access)
            }
            Err(e) => {
                let err = AuthError::from(e);
                if err.is_terminal() {
                    warn!(error = %err, "refresh rejected, clearing session");
                    self.store().clear();
                    self.events.emit(&TokenEvent::Cleared(ClearReason::RefreshRejected));
                } else {
                    warn!(error = %err, "token refresh failed");
                }
                Err(err)
            }
        }
    }
}
