// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Session token ownership and refresh.
//!
//! [`TokenManager`] is the only writer of the session token. Every other
//! component reads the current access token through it and asks it to
//! refresh; concurrent refresh requests share one in-flight call to the
//! [`TokenRefresher`].

mod manager;
mod refresher;
mod store;

pub use manager::{TokenConfig, TokenManager};
pub use refresher::{RefreshError, RefreshFuture, TokenRefresher};
pub use store::{TokenStore, ValidityCache};

use thiserror::Error;

/// Authentication failures surfaced to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("no active session\n  hint: run 'till-sync login' to install a token")]
    NoSession,

    #[error("access token expired")]
    Expired,

    #[error("session rejected: {0}\n  hint: run 'till-sync login' to sign in again")]
    Terminal(String),

    #[error("token refresh failed: {0}")]
    Network(String),
}

impl AuthError {
    /// Returns true if retrying cannot succeed without a new login.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AuthError::NoSession | AuthError::Terminal(_))
    }
}

impl From<RefreshError> for AuthError {
    fn from(err: RefreshError) -> Self {
        match err {
            RefreshError::Rejected(msg) => AuthError::Terminal(msg),
            RefreshError::Network(msg) => AuthError::Network(msg),
        }
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod manager_tests;
