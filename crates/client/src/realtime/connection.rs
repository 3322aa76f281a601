// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Realtime connection loop.
//!
//! [`RealtimeConnection::run`] keeps one socket open while the device is
//! online. Each connect attempt asks the token manager for a credential, so a
//! reconnect after a refresh always presents the current token. Closures are
//! classified by code and reason only: an auth closure ends the loop so the
//! caller can re-authenticate, anything else reconnects with backoff.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use till_core::close::ABNORMAL_CLOSURE;
use till_core::{ClockSource, CloseClassifier, CloseSignal, ConnectionState, SystemClock};
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::transport::{Transport, TransportError, TransportEvent, WebSocketTransport};
use crate::auth::{AuthError, TokenManager};
use crate::backoff::Backoff;

/// Close code used to report a handshake the server refused over HTTP.
const POLICY_VIOLATION: u16 = 1008;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealtimeConfig {
    pub url: String,
    /// Consecutive failed attempts before giving up (0 = unlimited).
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Ping interval; zero disables heartbeats.
    pub heartbeat_interval: Duration,
    /// How long a ping may go unanswered before the socket is dropped.
    pub heartbeat_timeout: Duration,
    pub classifier: CloseClassifier,
}

impl RealtimeConfig {
    pub fn new(url: impl Into<String>) -> Self {
        RealtimeConfig {
            url: url.into(),
            max_retries: 0,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            heartbeat_interval: Duration::from_secs(30),
            heartbeat_timeout: Duration::from_secs(10),
            classifier: CloseClassifier::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Connecting,
    Open,
    Closed,
}

/// Observable state of the realtime session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RealtimeSession {
    pub state: SessionState,
    pub connection_started_at: Option<DateTime<Utc>>,
    /// Set when the last closure was classified as an auth failure.
    pub is_auth_error: bool,
    /// Consecutive failed attempts.
    pub attempt: u32,
    #[serde(skip)]
    pub last_close: Option<CloseSignal>,
}

impl Default for RealtimeSession {
    fn default() -> Self {
        RealtimeSession {
            state: SessionState::Idle,
            connection_started_at: None,
            is_auth_error: false,
            attempt: 0,
            last_close: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RealtimeEvent {
    Connecting { attempt: u32 },
    Open,
    Message(String),
    Closed { signal: CloseSignal, is_auth_error: bool },
}

/// Why [`RealtimeConnection::run`] returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RealtimeExit {
    Cancelled,
    /// The server refused the credential. Re-authenticate before running again.
    AuthRejected(CloseSignal),
    /// No credential could be obtained.
    SessionEnded(AuthError),
    RetriesExhausted { attempts: u32 },
}

enum Step {
    Cancelled,
    NetworkChanged(bool),
    Heartbeat,
    PongOverdue,
    Event(Result<TransportEvent, TransportError>),
}

pub struct RealtimeConnection<T: Transport = WebSocketTransport> {
    config: RealtimeConfig,
    transport: T,
    tokens: TokenManager,
    network: watch::Receiver<ConnectionState>,
    session_tx: watch::Sender<RealtimeSession>,
    events: Option<mpsc::Sender<RealtimeEvent>>,
    clock: Arc<dyn ClockSource>,
    backoff: Backoff,
}

impl RealtimeConnection<WebSocketTransport> {
    pub fn new(config: RealtimeConfig, tokens: TokenManager, network: watch::Receiver<ConnectionState>) -> Self {
        Self::with_transport(config, WebSocketTransport::new(), tokens, network)
    }
}

impl<T: Transport> RealtimeConnection<T> {
    pub fn with_transport(
        config: RealtimeConfig,
        transport: T,
        tokens: TokenManager,
        network: watch::Receiver<ConnectionState>,
    ) -> Self {
        let (session_tx, _) = watch::channel(RealtimeSession::default());
        let backoff = Backoff::new(config.initial_delay, config.max_delay);
        RealtimeConnection {
            config,
            transport,
            tokens,
            network,
            session_tx,
            events: None,
            clock: Arc::new(SystemClock),
            backoff,
        }
    }

    /// Forwards lifecycle events and messages to `tx`.
    pub fn with_events(mut self, tx: mpsc::Sender<RealtimeEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn ClockSource>) -> Self {
        self.clock = clock;
        self
    }

    pub fn session(&self) -> RealtimeSession {
        self.session_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RealtimeSession> {
        self.session_tx.subscribe()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Sends a text frame on the open socket.
    pub async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.transport.send_text(text).await
    }

    /// Connects and keeps reconnecting until cancelled, rejected, or out of
    /// retries.
    pub async fn run(&mut self, cancel: CancellationToken) -> RealtimeExit {
        let mut failures: u32 = 0;
        loop {
            if !self.network.borrow().is_online {
                debug!("offline, waiting for connectivity");
                let online = tokio::select! {
                    _ = cancel.cancelled() => return self.finish(RealtimeExit::Cancelled),
                    online = crate::network::wait_until_online(&mut self.network) => online,
                };
                if !online {
                    warn!("network observer dropped, stopping realtime connection");
                    return self.finish(RealtimeExit::Cancelled);
                }
            }

            let attempt = failures + 1;
            self.begin_attempt(attempt).await;

            let token = tokio::select! {
                _ = cancel.cancelled() => return self.finish(RealtimeExit::Cancelled),
                token = self.tokens.get_token_with_refresh() => token,
            };

            // Locally detected failures never count as auth closures.
            let (signal, from_peer) = match token {
                Err(e) if e.is_terminal() => {
                    warn!(error = %e, "no credential for realtime connection");
                    return self.finish(RealtimeExit::SessionEnded(e));
                }
                Err(e) => {
                    warn!(error = %e, "could not refresh credential, will retry");
                    (CloseSignal::new(ABNORMAL_CLOSURE, "credential unavailable"), false)
                }
                Ok(token) => {
                    let connected = tokio::select! {
                        _ = cancel.cancelled() => return self.finish(RealtimeExit::Cancelled),
                        result = self.transport.connect(&self.config.url, &token) => result,
                    };
                    match connected {
                        Ok(()) => {
                            failures = 0;
                            self.mark_open().await;
                            match self.pump(&cancel).await {
                                Some(signal) => (signal, true),
                                None => {
                                    let _ = self.transport.disconnect().await;
                                    return self.finish(RealtimeExit::Cancelled);
                                }
                            }
                        }
                        Err(TransportError::HandshakeRejected { status })
                            if self.config.classifier.is_auth_handshake_status(status) =>
                        {
                            let signal = CloseSignal::new(POLICY_VIOLATION, format!("handshake rejected: HTTP {status}"));
                            self.record_close(signal.clone(), true).await;
                            warn!(status, "realtime handshake rejected credential");
                            return self.finish(RealtimeExit::AuthRejected(signal));
                        }
                        Err(e) => {
                            debug!(error = %e, "realtime connect failed");
                            (CloseSignal::new(ABNORMAL_CLOSURE, "connect failed"), false)
                        }
                    }
                }
            };

            let is_auth_error = from_peer && self.config.classifier.is_auth_close(&signal);
            self.record_close(signal.clone(), is_auth_error).await;
            if is_auth_error {
                warn!(close = %signal, "realtime connection closed for authentication");
                return self.finish(RealtimeExit::AuthRejected(signal));
            }

            failures += 1;
            if self.config.max_retries > 0 && failures >= self.config.max_retries {
                warn!(attempts = failures, "realtime reconnect attempts exhausted");
                return self.finish(RealtimeExit::RetriesExhausted { attempts: failures });
            }

            let delay = self.backoff.delay(failures - 1);
            info!(close = %signal, delay_ms = delay.as_millis() as u64, "realtime connection lost, reconnecting");
            tokio::select! {
                _ = cancel.cancelled() => return self.finish(RealtimeExit::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Reads from the open socket until it closes. None means cancelled.
    async fn pump(&mut self, cancel: &CancellationToken) -> Option<CloseSignal> {
        let heartbeat = !self.config.heartbeat_interval.is_zero();
        let period = if heartbeat {
            self.config.heartbeat_interval
        } else {
            Duration::from_secs(3600)
        };
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut awaiting_pong: Option<Instant> = None;
        let mut watch_network = true;

        loop {
            let pong_deadline = awaiting_pong.map(|sent| sent + self.config.heartbeat_timeout);
            let step = tokio::select! {
                _ = cancel.cancelled() => Step::Cancelled,
                changed = self.network.changed(), if watch_network => Step::NetworkChanged(changed.is_ok()),
                _ = ticker.tick(), if heartbeat => Step::Heartbeat,
                _ = tokio::time::sleep_until(pong_deadline.unwrap_or_else(Instant::now)), if pong_deadline.is_some() => {
                    Step::PongOverdue
                }
                event = self.transport.recv() => Step::Event(event),
            };

            match step {
                Step::Cancelled => return None,
                Step::NetworkChanged(false) => watch_network = false,
                Step::NetworkChanged(true) => {
                    if !self.network.borrow_and_update().is_online {
                        let _ = self.transport.disconnect().await;
                        return Some(CloseSignal::new(ABNORMAL_CLOSURE, "network lost"));
                    }
                }
                Step::PongOverdue => {
                    warn!("heartbeat unanswered, dropping connection");
                    let _ = self.transport.disconnect().await;
                    return Some(CloseSignal::new(ABNORMAL_CLOSURE, "heartbeat timeout"));
                }
                Step::Heartbeat => {
                    if awaiting_pong.is_some() {
                        continue;
                    }
                    if self.transport.ping().await.is_err() {
                        return Some(CloseSignal::abnormal());
                    }
                    awaiting_pong = Some(Instant::now());
                }
                Step::Event(Ok(TransportEvent::Pong)) => awaiting_pong = None,
                Step::Event(Ok(TransportEvent::Message(text))) => {
                    awaiting_pong = None;
                    self.emit(RealtimeEvent::Message(text)).await;
                }
                Step::Event(Ok(TransportEvent::Closed(signal))) => return Some(signal),
                Step::Event(Err(e)) => {
                    debug!(error = %e, "realtime receive failed");
                    return Some(CloseSignal::abnormal());
                }
            }
        }
    }

    async fn begin_attempt(&mut self, attempt: u32) {
        let now = self.clock.now_utc();
        self.session_tx.send_modify(|s| {
            s.state = SessionState::Connecting;
            s.connection_started_at = Some(now);
            s.is_auth_error = false;
            s.attempt = attempt;
        });
        debug!(attempt, url = %self.config.url, "connecting realtime socket");
        self.emit(RealtimeEvent::Connecting { attempt }).await;
    }

    async fn mark_open(&mut self) {
        self.session_tx.send_modify(|s| {
            s.state = SessionState::Open;
            s.attempt = 0;
        });
        info!(url = %self.config.url, "realtime connection open");
        self.emit(RealtimeEvent::Open).await;
    }

    async fn record_close(&mut self, signal: CloseSignal, is_auth_error: bool) {
        self.session_tx.send_modify(|s| {
            s.state = SessionState::Closed;
            s.is_auth_error = is_auth_error;
            s.last_close = Some(signal.clone());
        });
        self.emit(RealtimeEvent::Closed { signal, is_auth_error }).await;
    }

    fn finish(&mut self, exit: RealtimeExit) -> RealtimeExit {
        self.session_tx.send_modify(|s| {
            if s.state != SessionState::Closed {
                s.state = SessionState::Closed;
            }
        });
        debug!(?exit, "realtime connection stopped");
        exit
    }

    async fn emit(&self, event: RealtimeEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event).await;
        }
    }
}
