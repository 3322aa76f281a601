// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{ApiError, ApiRequest, ApiResponse, HttpBackend};
use crate::auth::{AuthError, TokenManager};

type Responder = oneshot::Sender<Result<ApiResponse, ApiError>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptorConfig {
    /// Longest a call waits for a token refresh it did not start.
    pub queue_timeout: Duration,
}

impl Default for InterceptorConfig {
    fn default() -> Self {
        InterceptorConfig {
            queue_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    /// Waiting on the refresh call.
    Refreshing,
    /// Refresh settled; queued calls are being replayed.
    Replaying,
}

struct QueuedRequest {
    id: u64,
    request: ApiRequest,
    enqueued_at: Instant,
    responder: Responder,
}

struct State {
    phase: Phase,
    queue: VecDeque<QueuedRequest>,
    next_id: u64,
}

struct Inner {
    backend: Arc<dyn HttpBackend>,
    tokens: TokenManager,
    config: InterceptorConfig,
    state: Mutex<State>,
}

enum Recovery {
    /// The token changed since the call was sent; resend with this one.
    Resend(String, ApiRequest),
    /// Wait for a refresh-and-replay cycle to answer.
    Wait {
        id: u64,
        rx: oneshot::Receiver<Result<ApiResponse, ApiError>>,
        bounded: bool,
    },
}

/// Attaches the bearer token to every call and recovers from `401`.
///
/// The first call to see a `401` starts a refresh. Calls that see a `401`
/// while it runs are queued and, once it succeeds, replayed one at a time in
/// arrival order with the new token. If the refresh fails every queued call
/// fails with the same error.
#[derive(Clone)]
pub struct RequestInterceptor {
    inner: Arc<Inner>,
}

impl RequestInterceptor {
    pub fn new(backend: Arc<dyn HttpBackend>, tokens: TokenManager, config: InterceptorConfig) -> Self {
        RequestInterceptor {
            inner: Arc::new(Inner {
                backend,
                tokens,
                config,
                state: Mutex::new(State {
                    phase: Phase::Idle,
                    queue: VecDeque::new(),
                    next_id: 0,
                }),
            }),
        }
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.inner.tokens
    }

    /// Number of calls waiting on a refresh.
    pub fn queued_len(&self) -> usize {
        self.inner.state().queue.len()
    }

    /// Sends `request`, refreshing and replaying on `401`.
    ///
    /// A replayed call that is rejected again fails with
    /// [`AuthError::Expired`] instead of starting another refresh.
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let token = self.inner.tokens.get_token_with_refresh().await?;
        let response = self.inner.backend.send(&request, &token).await?;
        if !response.is_unauthorized() {
            return Ok(response);
        }

        debug!(method = %request.method, path = %request.path, "unauthorized, recovering");
        match self.inner.recover(&token, request) {
            Recovery::Resend(current, request) => self.inner.replay(&request, &current).await,
            Recovery::Wait { id, rx, bounded } => self.inner.wait(id, rx, bounded).await,
        }
    }
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn recover(self: &Arc<Self>, used_token: &str, request: ApiRequest) -> Recovery {
        let mut state = self.state();

        if state.phase == Phase::Idle {
            if let Some(current) = self.tokens.access_token() {
                if current != used_token {
                    return Recovery::Resend(current, request);
                }
            }
        }

        let (tx, rx) = oneshot::channel();
        let id = state.next_id;
        state.next_id = state.next_id.wrapping_add(1);
        state.queue.push_back(QueuedRequest {
            id,
            request,
            enqueued_at: Instant::now(),
            responder: tx,
        });

        if state.phase == Phase::Idle {
            state.phase = Phase::Refreshing;
            drop(state);
            tokio::spawn(Arc::clone(self).refresh_and_replay());
            // The caller that started the cycle waits for its own replay.
            return Recovery::Wait {
                id,
                rx,
                bounded: false,
            };
        }

        debug!(queued = state.queue.len(), "refresh in progress, queueing request");
        Recovery::Wait {
            id,
            rx,
            bounded: true,
        }
    }

    async fn wait(
        &self,
        id: u64,
        mut rx: oneshot::Receiver<Result<ApiResponse, ApiError>>,
        bounded: bool,
    ) -> Result<ApiResponse, ApiError> {
        // Dropping this future before the refresh settles takes the request
        // out of the queue.
        let _waiting = Waiting { inner: self, id };
        if bounded {
            match tokio::time::timeout(self.config.queue_timeout, &mut rx).await {
                Ok(result) => return result.unwrap_or_else(|_| Err(abandoned())),
                Err(_) => {
                    if self.withdraw(id) {
                        let timeout_ms =
                            u64::try_from(self.config.queue_timeout.as_millis()).unwrap_or(u64::MAX);
                        warn!(timeout_ms, "queued request timed out waiting for refresh");
                        return Err(ApiError::RequestTimeout { timeout_ms });
                    }
                    // The refresh already settled; the replay owns the request.
                }
            }
        }
        rx.await.unwrap_or_else(|_| Err(abandoned()))
    }

    /// Removes a still-waiting request. False once the refresh has settled.
    fn withdraw(&self, id: u64) -> bool {
        let mut state = self.state();
        if state.phase != Phase::Refreshing {
            return false;
        }
        let before = state.queue.len();
        state.queue.retain(|q| q.id != id);
        state.queue.len() != before
    }

    async fn refresh_and_replay(self: Arc<Self>) {
        let refreshed = self.tokens.refresh_auth_token().await;

        let token = match refreshed {
            Ok(token) => token,
            Err(err) => {
                let failed: Vec<QueuedRequest> = {
                    let mut state = self.state();
                    state.phase = Phase::Idle;
                    state.queue.drain(..).collect()
                };
                warn!(error = %err, rejected = failed.len(), "refresh failed, rejecting queued requests");
                for queued in failed {
                    let _ = queued.responder.send(Err(ApiError::Auth(err.clone())));
                }
                return;
            }
        };

        let pending = {
            let mut state = self.state();
            state.phase = Phase::Replaying;
            state.queue.len()
        };
        info!(pending, "token refreshed, replaying queued requests");

        loop {
            let next = {
                let mut state = self.state();
                match state.queue.pop_front() {
                    Some(next) => next,
                    None => {
                        state.phase = Phase::Idle;
                        break;
                    }
                }
            };
            if next.responder.is_closed() {
                debug!(path = %next.request.path, "caller gone, not replaying");
                continue;
            }
            debug!(
                path = %next.request.path,
                waited_ms = next.enqueued_at.elapsed().as_millis() as u64,
                "replaying request"
            );
            let result = self.replay(&next.request, &token).await;
            let _ = next.responder.send(result);
        }
    }

    async fn replay(&self, request: &ApiRequest, token: &str) -> Result<ApiResponse, ApiError> {
        let response = self.backend.send(request, token).await?;
        if response.is_unauthorized() {
            warn!(path = %request.path, "request rejected after token refresh");
            return Err(ApiError::Auth(AuthError::Expired));
        }
        Ok(response)
    }
}

struct Waiting<'a> {
    inner: &'a Inner,
    id: u64,
}

impl Drop for Waiting<'_> {
    fn drop(&mut self) {
        if self.inner.withdraw(self.id) {
            debug!(id = self.id, "queued request withdrawn by caller");
        }
    }
}

fn abandoned() -> ApiError {
    ApiError::Network("request abandoned before a response arrived".to_string())
}
