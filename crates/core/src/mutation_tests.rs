// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use chrono::Duration;
use serde_json::json;
use yare::parameterized;

fn sample() -> Mutation {
    Mutation::new(
        "orders.create",
        HttpMethod::Post,
        "/orders",
        json!({"table": 4, "items": [1, 2]}),
    )
}

#[parameterized(
    pending = { "pending", MutationStatus::Pending },
    syncing = { "syncing", MutationStatus::Syncing },
    failed = { "failed", MutationStatus::Failed },
    conflict_upper = { "CONFLICT", MutationStatus::Conflict },
)]
fn status_parse(input: &str, expected: MutationStatus) {
    assert_eq!(input.parse::<MutationStatus>().unwrap(), expected);
}

#[test]
fn status_parse_rejects_unknown() {
    assert!("done".parse::<MutationStatus>().is_err());
}

#[parameterized(
    post = { "post", HttpMethod::Post },
    put = { "PUT", HttpMethod::Put },
    patch = { "Patch", HttpMethod::Patch },
    delete = { "delete", HttpMethod::Delete },
)]
fn method_parse(input: &str, expected: HttpMethod) {
    assert_eq!(input.parse::<HttpMethod>().unwrap(), expected);
}

#[test]
fn method_parse_rejects_reads() {
    assert!("GET".parse::<HttpMethod>().is_err());
}

#[test]
fn mutation_id_parse_display() {
    let id = MutationId::generate();
    let parsed: MutationId = id.to_string().parse().unwrap();
    assert_eq!(id, parsed);
    assert_eq!(id.short().len(), 8);
    assert!("not-a-uuid".parse::<MutationId>().is_err());
}

#[test]
fn validate_requires_operation_and_absolute_path() {
    assert!(sample().validate().is_ok());

    let mut no_op = sample();
    no_op.operation = "  ".into();
    assert!(no_op.validate().is_err());

    let mut relative = sample();
    relative.path = "orders".into();
    assert!(relative.validate().is_err());
}

#[test]
fn serialized_record_is_flat() {
    let record = OfflineMutation::new(sample(), DateTime::<Utc>::UNIX_EPOCH);
    let value = serde_json::to_value(&record).unwrap();
    assert_eq!(value["operation"], "orders.create");
    assert_eq!(value["method"], "POST");
    assert_eq!(value["status"], "pending");
    assert!(value.get("server_version").is_none());

    let back: OfflineMutation = serde_json::from_value(value).unwrap();
    assert_eq!(back, record);
}

#[test]
fn mark_failed_increments_and_schedules() {
    let now = Utc::now();
    let mut record = OfflineMutation::new(sample(), now);
    record.mark_syncing();
    assert_eq!(record.status, MutationStatus::Syncing);

    record.mark_failed("connection reset", now + Duration::seconds(2));
    assert_eq!(record.status, MutationStatus::Failed);
    assert_eq!(record.retry_count, 1);
    assert_eq!(record.last_error.as_deref(), Some("connection reset"));
    assert!(!record.is_due(now));
    assert!(record.is_due(now + Duration::seconds(2)));
}

#[test]
fn rebase_on_server_requeues_with_server_version() {
    let now = Utc::now();
    let mut record = OfflineMutation::new(sample().with_base_version(3), now);
    record.mark_failed("timeout", now);
    record.mark_conflict(Some(7), Some(json!({"table": 5})));
    assert_eq!(record.status, MutationStatus::Conflict);

    record.rebase_on_server();
    assert_eq!(record.status, MutationStatus::Pending);
    assert_eq!(record.mutation.base_version, Some(7));
    assert_eq!(record.retry_count, 0);
    assert!(record.server_state.is_none());
    assert!(record.is_due(now));
}
