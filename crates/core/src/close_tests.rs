// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use yare::parameterized;

#[parameterized(
    reserved_4001 = { 4001, "", true },
    reserved_4003 = { 4003, "", true },
    reason_unauthorized = { 1008, "Unauthorized", true },
    reason_token_expired = { 1000, "session closed: token expired", true },
    reason_jwt = { 4000, "JWT expired at 12:00", true },
    abnormal_empty = { 1006, "", false },
    going_away = { 1001, "server restart", false },
    normal = { 1000, "bye", false },
    internal_error = { 1011, "internal error", false },
)]
fn default_classification(code: u16, reason: &str, expected: bool) {
    let classifier = CloseClassifier::default();
    assert_eq!(classifier.is_auth_close(&CloseSignal::new(code, reason)), expected);
}

#[test]
fn abnormal_closure_is_never_auth() {
    let classifier = CloseClassifier::default();
    assert!(!classifier.is_auth_close(&CloseSignal::abnormal()));
}

#[test]
fn custom_codes_replace_defaults() {
    let classifier = CloseClassifier::new(vec![4401], vec!["denied".into()]);
    assert!(classifier.is_auth_close(&CloseSignal::new(4401, "")));
    assert!(!classifier.is_auth_close(&CloseSignal::new(4001, "")));
    assert!(classifier.is_auth_close(&CloseSignal::new(1008, "Access DENIED")));
}

#[test]
fn blank_patterns_do_not_match_everything() {
    let classifier = CloseClassifier::new(vec![], vec!["".into(), "  ".into()]);
    assert!(!classifier.is_auth_close(&CloseSignal::new(1000, "anything")));
}

#[parameterized(
    unauthorized = { 401, true },
    forbidden = { 403, true },
    not_found = { 404, false },
    bad_gateway = { 502, false },
)]
fn handshake_status(status: u16, expected: bool) {
    assert_eq!(CloseClassifier::default().is_auth_handshake_status(status), expected);
}

#[test]
fn display_includes_reason_when_present() {
    assert_eq!(CloseSignal::abnormal().to_string(), "code 1006");
    assert_eq!(CloseSignal::new(4001, "unauthorized").to_string(), "code 4001 (unauthorized)");
}
