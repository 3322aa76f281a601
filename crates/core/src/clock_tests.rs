// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use std::sync::atomic::{AtomicU64, Ordering};

struct FixedClock(AtomicU64);

impl ClockSource for FixedClock {
    fn now_ms(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[test]
fn system_clock_is_after_2020() {
    // 2020-01-01T00:00:00Z
    assert!(SystemClock.now_ms() > 1_577_836_800_000);
}

#[test]
fn now_secs_truncates_millis() {
    let clock = FixedClock(AtomicU64::new(12_999));
    assert_eq!(clock.now_secs(), 12);
}

#[test]
fn now_utc_matches_millis() {
    let clock = FixedClock(AtomicU64::new(1_700_000_000_123));
    assert_eq!(clock.now_utc().timestamp_millis(), 1_700_000_000_123);
}

#[test]
fn arc_clock_delegates() {
    let clock: Arc<dyn ClockSource> = Arc::new(FixedClock(AtomicU64::new(42)));
    assert_eq!(clock.now_ms(), 42);
}

#[test]
fn to_utc_saturates_out_of_range() {
    assert_eq!(to_utc(u64::MAX), DateTime::<Utc>::UNIX_EPOCH);
}
