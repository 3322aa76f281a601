// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Authentication token pair.
//!
//! The serialized form matches the refresh endpoint's response body
//! (`{"accessToken", "refreshToken", "expiresAt"}`), so a refreshed token can
//! be deserialized directly from the server reply.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An access/refresh token pair with its server-issued expiry.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    /// Bearer credential attached to every outbound call.
    pub access_token: String,
    /// Credential exchanged for a new pair at the refresh endpoint.
    pub refresh_token: String,
    /// Expiry of the access token in seconds since Unix epoch.
    pub expires_at: u64,
}

impl Token {
    /// Creates a new token pair.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: u64,
    ) -> Self {
        Token {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at,
        }
    }

    /// Returns true if the access token expires within `buffer_secs` of `now_secs`.
    pub fn expires_within(&self, now_secs: u64, buffer_secs: u64) -> bool {
        now_secs.saturating_add(buffer_secs) >= self.expires_at
    }

    /// Seconds until expiry, zero if already expired.
    pub fn remaining_secs(&self, now_secs: u64) -> u64 {
        self.expires_at.saturating_sub(now_secs)
    }
}

// Credentials never reach logs.
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

fn redact(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    format!("{visible}***")
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
