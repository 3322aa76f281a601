// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;
use till_core::MutationId;

use crate::auth::AuthError;
use crate::http::ApiError;
use crate::queue::QueueError;

/// Errors surfaced by the sync façade and the operator CLI.
///
/// Recoverable delivery failures stay inside the queue; what reaches this
/// type needs the caller's attention.
#[derive(Debug, Error)]
pub enum Error {
    #[error("access token expired")]
    AuthExpired,

    #[error("session rejected: {0}\n  hint: run 'till-sync login' to sign in again")]
    AuthTerminal(String),

    #[error("no active session\n  hint: run 'till-sync login' to install a token")]
    NoSession,

    #[error("request timed out after {timeout_ms}ms waiting for token refresh")]
    RequestTimeout { timeout_ms: u64 },

    #[error("network error: {0}")]
    Network(String),

    #[error("mutation {id} conflicts with the server\n  hint: run 'till-sync resolve {id} --keep-local' or '--discard'")]
    Conflict {
        id: MutationId,
        server_version: Option<u64>,
    },

    #[error("device is offline")]
    Offline,

    #[error("realtime connection rejected: {0}")]
    RealtimeRejected(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Queue(QueueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] till_core::Error),
}

impl From<AuthError> for Error {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::NoSession => Error::NoSession,
            AuthError::Expired => Error::AuthExpired,
            AuthError::Terminal(msg) => Error::AuthTerminal(msg),
            AuthError::Network(msg) => Error::Network(msg),
        }
    }
}

impl From<ApiError> for Error {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Auth(e) => e.into(),
            ApiError::RequestTimeout { timeout_ms } => Error::RequestTimeout { timeout_ms },
            ApiError::Network(msg) => Error::Network(msg),
            ApiError::InvalidRequest(msg) => Error::Config(msg),
        }
    }
}

impl From<QueueError> for Error {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Auth(e) => e.into(),
            QueueError::Io(e) => Error::Io(e),
            other => Error::Queue(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
