// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Realtime close signals and their classification.
//!
//! A close is an authentication failure only when the server says so
//! explicitly: a reserved close code, a reason matching a known auth-failure
//! pattern, or an HTTP 401/403 answer to the upgrade request. Generic abnormal
//! closures are network failures no matter how soon after connecting they
//! happen; connection duration is never consulted.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Normal closure.
pub const NORMAL_CLOSURE: u16 = 1000;
/// Connection dropped without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Close codes the backend reserves for authentication rejection.
pub const DEFAULT_AUTH_CLOSE_CODES: &[u16] = &[4001, 4003];

/// Reason fragments (case-insensitive) that mark an authentication rejection.
pub const DEFAULT_AUTH_REASON_PATTERNS: &[&str] = &[
    "unauthorized",
    "unauthorised",
    "authentication failed",
    "invalid token",
    "token expired",
    "jwt expired",
];

/// Code and reason carried by a connection close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseSignal {
    pub code: u16,
    #[serde(default)]
    pub reason: String,
}

impl CloseSignal {
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        CloseSignal {
            code,
            reason: reason.into(),
        }
    }

    /// A close with no frame from the peer (code 1006, empty reason).
    pub fn abnormal() -> Self {
        CloseSignal::new(ABNORMAL_CLOSURE, "")
    }

    /// Returns true for a clean 1000 close.
    pub fn is_normal(&self) -> bool {
        self.code == NORMAL_CLOSURE
    }
}

impl fmt::Display for CloseSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reason.is_empty() {
            write!(f, "code {}", self.code)
        } else {
            write!(f, "code {} ({})", self.code, self.reason)
        }
    }
}

/// Decides whether a close signal is an authentication failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseClassifier {
    auth_codes: Vec<u16>,
    reason_patterns: Vec<String>,
}

impl Default for CloseClassifier {
    fn default() -> Self {
        CloseClassifier::new(
            DEFAULT_AUTH_CLOSE_CODES.to_vec(),
            DEFAULT_AUTH_REASON_PATTERNS.iter().map(|p| p.to_string()).collect(),
        )
    }
}

impl CloseClassifier {
    /// Creates a classifier from reserved codes and reason patterns.
    ///
    /// Patterns are matched case-insensitively as substrings; blank patterns
    /// are ignored.
    pub fn new(auth_codes: Vec<u16>, reason_patterns: Vec<String>) -> Self {
        let reason_patterns = reason_patterns
            .into_iter()
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        CloseClassifier {
            auth_codes,
            reason_patterns,
        }
    }

    /// Returns true if the close explicitly signals an authentication failure.
    pub fn is_auth_close(&self, signal: &CloseSignal) -> bool {
        if self.auth_codes.contains(&signal.code) {
            return true;
        }
        let reason = signal.reason.trim().to_lowercase();
        if reason.is_empty() {
            return false;
        }
        self.reason_patterns.iter().any(|p| reason.contains(p.as_str()))
    }

    /// Returns true if an HTTP status rejecting the upgrade is an auth failure.
    pub fn is_auth_handshake_status(&self, status: u16) -> bool {
        matches!(status, 401 | 403)
    }
}

#[cfg(test)]
#[path = "close_tests.rs"]
mod tests;
