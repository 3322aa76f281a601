// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use serde_json::{json, Value};
use till_core::{HttpMethod, Mutation, OfflineMutation};
use yare::parameterized;

use super::*;

#[parameterized(
    ok = { 200, true, false, false },
    created = { 201, true, false, false },
    conflict = { 409, false, true, false },
    precondition = { 412, false, true, false },
    throttled = { 429, false, false, true },
    request_timeout = { 408, false, false, true },
    server_error = { 503, false, false, true },
    bad_request = { 400, false, false, false },
)]
fn response_classification(status: u16, success: bool, conflict: bool, retryable: bool) {
    let response = ApiResponse::new(status, Value::Null);
    assert_eq!(response.is_success(), success);
    assert_eq!(response.is_conflict(), conflict);
    assert_eq!(response.is_retryable(), retryable);
}

#[test]
fn message_prefers_body_fields() {
    assert_eq!(
        ApiResponse::new(422, json!({"message": "name required"})).message(),
        "name required"
    );
    assert_eq!(ApiResponse::new(400, json!({"error": "bad"})).message(), "bad");
    assert_eq!(ApiResponse::new(400, json!("plain text")).message(), "plain text");
    assert_eq!(ApiResponse::new(404, Value::Null).message(), "HTTP 404");
}

#[test]
fn mutation_request_carries_id_and_version() {
    let mutation = Mutation::new(
        "orders.update",
        HttpMethod::Patch,
        "/orders/9",
        json!({"qty": 2}),
    )
    .with_base_version(4);
    let record = OfflineMutation::new(mutation, chrono::Utc::now());

    let request = ApiRequest::for_mutation(&record);

    assert_eq!(request.method, RequestMethod::Patch);
    assert_eq!(request.path, "/orders/9");
    assert_eq!(request.body, Some(json!({"qty": 2})));
    assert_eq!(request.idempotency_key, Some(record.id.to_string()));
    assert_eq!(request.base_version, Some(4));
}

#[test]
fn delete_without_payload_sends_no_body() {
    let mutation = Mutation::new("orders.delete", HttpMethod::Delete, "/orders/9", Value::Null);
    let record = OfflineMutation::new(mutation, chrono::Utc::now());

    assert_eq!(ApiRequest::for_mutation(&record).body, None);
}
