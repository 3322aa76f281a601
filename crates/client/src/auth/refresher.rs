// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;
use till_core::Token;

/// Refresh endpoint failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    /// The server refused the refresh token. The session is over.
    #[error("refresh token rejected: {0}")]
    Rejected(String),

    /// The refresh call did not reach a verdict.
    #[error("refresh request failed: {0}")]
    Network(String),
}

pub type RefreshFuture<'a> = Pin<Box<dyn Future<Output = Result<Token, RefreshError>> + Send + 'a>>;

/// Exchanges a refresh token for a new token pair.
pub trait TokenRefresher: Send + Sync {
    fn refresh<'a>(&'a self, refresh_token: &'a str) -> RefreshFuture<'a>;
}
