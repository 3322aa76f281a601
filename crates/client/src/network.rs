// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connectivity tracking.
//!
//! The platform layer feeds OS reports into [`NetworkObserver::update`];
//! subscribers are woken only when the state actually changes.

use till_core::ConnectionState;
use tokio::sync::watch;
use tracing::info;

pub struct NetworkObserver {
    tx: watch::Sender<ConnectionState>,
}

impl NetworkObserver {
    pub fn new(initial: ConnectionState) -> Self {
        let (tx, _) = watch::channel(initial);
        NetworkObserver { tx }
    }

    /// Records a connectivity report. Returns true if it changed the state.
    pub fn update(&self, state: ConnectionState) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state.clone();
            true
        });
        if changed {
            info!(
                online = state.is_online,
                network = state.network_type.as_deref().unwrap_or("unknown"),
                "connectivity changed"
            );
        }
        changed
    }

    pub fn set_online(&self, network_type: impl Into<String>) -> bool {
        self.update(ConnectionState::online(network_type))
    }

    pub fn set_offline(&self) -> bool {
        self.update(ConnectionState::offline())
    }

    pub fn current(&self) -> ConnectionState {
        self.tx.borrow().clone()
    }

    pub fn is_online(&self) -> bool {
        self.tx.borrow().is_online
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.tx.subscribe()
    }
}

/// Waits until `rx` reports online. Returns false if the observer is gone.
pub async fn wait_until_online(rx: &mut watch::Receiver<ConnectionState>) -> bool {
    rx.wait_for(|s| s.is_online).await.is_ok()
}

#[cfg(test)]
#[path = "network_tests.rs"]
mod tests;
