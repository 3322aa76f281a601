// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use till_core::Token;

/// Memoized result of a token validity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityCache {
    pub is_valid: bool,
    pub computed_at_ms: u64,
    pub ttl_ms: u64,
}

impl ValidityCache {
    /// Returns true while the cached verdict may be reused at `now_ms`.
    pub fn is_fresh(&self, now_ms: u64) -> bool {
        now_ms >= self.computed_at_ms && now_ms - self.computed_at_ms < self.ttl_ms
    }
}

/// In-memory session state.
///
/// Mutators are crate-private so only the token manager can change the
/// session. Any token change drops the cached validity verdict.
#[derive(Debug, Default)]
pub struct TokenStore {
    token: Option<Token>,
    validity: Option<ValidityCache>,
}

impl TokenStore {
    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    pub fn validity(&self) -> Option<ValidityCache> {
        self.validity
    }

    pub(crate) fn replace(&mut self, token: Token) {
        self.token = Some(token);
        self.validity = None;
    }

    pub(crate) fn clear(&mut self) -> Option<Token> {
        self.validity = None;
        self.token.take()
    }

    /// Cached verdict, if one was computed less than its TTL ago.
    pub(crate) fn cached_validity(&self, now_ms: u64) -> Option<bool> {
        self.validity.filter(|c| c.is_fresh(now_ms)).map(|c| c.is_valid)
    }

    pub(crate) fn cache_validity(&mut self, is_valid: bool, now_ms: u64, ttl_ms: u64) {
        self.validity = Some(ValidityCache {
            is_valid,
            computed_at_ms: now_ms,
            ttl_ms,
        });
    }
}
