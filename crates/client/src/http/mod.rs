// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Authenticated HTTP calls.
//!
//! [`HttpBackend`] performs one call with a given bearer token.
//! [`RequestInterceptor`] wraps a backend and turns a `401` into a single
//! shared refresh followed by an in-order replay of every call that hit the
//! `401` while the refresh was running.

mod backend;
mod interceptor;
mod rest;

pub use backend::{ApiRequest, ApiResponse, BackendFuture, HttpBackend, RequestMethod};
pub use interceptor::{InterceptorConfig, RequestInterceptor};
pub use rest::RestBackend;

use thiserror::Error;

use crate::auth::AuthError;

/// Failures of an intercepted call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("request timed out after {timeout_ms}ms waiting for token refresh")]
    RequestTimeout { timeout_ms: u64 },

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// Returns true if the same call may succeed later.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Auth(e) => !e.is_terminal(),
            ApiError::RequestTimeout { .. } | ApiError::Network(_) => true,
            ApiError::InvalidRequest(_) => false,
        }
    }
}

#[cfg(test)]
#[path = "backend_tests.rs"]
mod backend_tests;
