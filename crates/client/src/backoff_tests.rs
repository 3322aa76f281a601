// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    first = { 0, 100 },
    second = { 1, 200 },
    third = { 2, 400 },
    capped = { 10, 30_000 },
    huge_attempt = { 200, 30_000 },
)]
fn doubles_until_cap(attempt: u32, expected_ms: u64) {
    let backoff = Backoff::new(Duration::from_millis(100), Duration::from_secs(30));
    assert_eq!(backoff.delay(attempt), Duration::from_millis(expected_ms));
}

#[test]
fn max_never_below_initial() {
    let backoff = Backoff::new(Duration::from_secs(5), Duration::from_secs(1));
    assert_eq!(backoff.max(), Duration::from_secs(5));
    assert_eq!(backoff.delay(3), Duration::from_secs(5));
}
