// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use chrono::TimeZone;
use serde_json::json;
use till_core::{HttpMethod, Mutation, OfflineMutation};

use super::*;

fn record() -> OfflineMutation {
    let created = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().unwrap_or_default();
    OfflineMutation::new(
        Mutation::new("orders.update", HttpMethod::Put, "/orders/42", json!({"qty": 1})),
        created,
    )
}

#[test]
fn pending_item_line() {
    let item = record();
    let line = format_item(&item);
    assert!(line.starts_with(&item.id.short()));
    assert!(line.contains("pending "));
    assert!(line.contains("PUT    /orders/42  orders.update"));
    assert!(!line.contains("retries="));
}

#[test]
fn failed_item_line_shows_retries_and_error() {
    let mut item = record();
    item.mark_failed("HTTP 503", Utc::now());
    let line = format_item(&item);
    assert!(line.contains("failed"));
    assert!(line.contains("retries=1"));
    assert!(line.ends_with("error: HTTP 503"));
}

#[test]
fn epoch_formats_as_utc() {
    assert_eq!(format_epoch(1_767_225_600), "2026-01-01 00:00:00 UTC");
    assert_eq!(format_epoch(u64::MAX), u64::MAX.to_string());
}
