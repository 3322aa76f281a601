// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Keyed event listeners.
//!
//! Listeners are registered under a key. Registering a key that is already
//! present is a no-op, so a subsystem that runs its setup routine twice still
//! ends up with exactly one subscription.

use std::sync::{Arc, Mutex};

use till_core::Token;

/// Why the session token was cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearReason {
    /// Explicit logout.
    Logout,
    /// The refresh endpoint rejected the refresh token.
    RefreshRejected,
}

/// Token lifecycle events emitted by the token manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenEvent {
    /// A session was installed (login or restore).
    Established(Token),
    /// The token pair was replaced by a successful refresh.
    Refreshed(Token),
    /// The session was cleared.
    Cleared(ClearReason),
}

impl TokenEvent {
    /// Event name as used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            TokenEvent::Established(_) => "token:established",
            TokenEvent::Refreshed(_) => "token:refreshed",
            TokenEvent::Cleared(_) => "token:cleared",
        }
    }
}

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Synchronous fan-out of events to keyed listeners.
pub struct EventBus<E> {
    listeners: Mutex<Vec<(String, Listener<E>)>>,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        EventBus {
            listeners: Mutex::new(Vec::new()),
        }
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` under `key`.
    ///
    /// Returns false, leaving the existing listener in place, if `key` is
    /// already registered.
    pub fn subscribe<F>(&self, key: impl Into<String>, listener: F) -> bool
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let key = key.into();
        let mut listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        if listeners.iter().any(|(k, _)| *k == key) {
            tracing::debug!(key = %key, "listener already registered");
            return false;
        }
        listeners.push((key, Arc::new(listener)));
        true
    }

    /// Removes the listener registered under `key`.
    pub fn unsubscribe(&self, key: &str) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        let before = listeners.len();
        listeners.retain(|(k, _)| k != key);
        listeners.len() != before
    }

    pub fn is_subscribed(&self, key: &str) -> bool {
        let listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        listeners.iter().any(|(k, _)| k == key)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Delivers `event` to every listener in registration order.
    ///
    /// Listeners run outside the registry lock and may subscribe or
    /// unsubscribe re-entrantly.
    pub fn emit(&self, event: &E) {
        let snapshot: Vec<Listener<E>> = {
            let listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
            listeners.iter().map(|(_, l)| Arc::clone(l)).collect()
        };
        for listener in snapshot {
            listener(event);
        }
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
