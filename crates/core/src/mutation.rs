// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Offline mutation records.
//!
//! A [`Mutation`] describes a write the application wants the backend to
//! perform. Once accepted by the offline queue it becomes an
//! [`OfflineMutation`]: the same write plus a stable client-generated id and
//! delivery bookkeeping. The id is sent with every delivery attempt so the
//! server can deduplicate re-deliveries after a crash.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Stable, client-generated identifier of an offline mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MutationId(Uuid);

impl MutationId {
    /// Generates a fresh random id.
    pub fn generate() -> Self {
        MutationId(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        MutationId(uuid)
    }

    /// Short form used in log lines.
    pub fn short(&self) -> String {
        self.0.simple().to_string().chars().take(8).collect()
    }
}

impl fmt::Display for MutationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MutationId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s.trim())
            .map(MutationId)
            .map_err(|_| Error::InvalidMutationId(s.to_string()))
    }
}

/// Delivery status of an offline mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationStatus {
    /// Waiting for its first (or next automatic) delivery attempt.
    Pending,
    /// A delivery attempt is in progress.
    Syncing,
    /// The last attempt failed with a retryable error.
    Failed,
    /// The server reported a version mismatch; needs explicit resolution.
    Conflict,
}

impl MutationStatus {
    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationStatus::Pending => "pending",
            MutationStatus::Syncing => "syncing",
            MutationStatus::Failed => "failed",
            MutationStatus::Conflict => "conflict",
        }
    }
}

impl fmt::Display for MutationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MutationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(MutationStatus::Pending),
            "syncing" => Ok(MutationStatus::Syncing),
            "failed" => Ok(MutationStatus::Failed),
            "conflict" => Ok(MutationStatus::Conflict),
            _ => Err(Error::InvalidStatus(s.to_string())),
        }
    }
}

/// HTTP method of a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            _ => Err(Error::InvalidMethod(s.to_string())),
        }
    }
}

/// A write the application wants delivered to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mutation {
    /// Logical operation name (e.g. `orders.create`), used for display and logs.
    pub operation: String,
    pub method: HttpMethod,
    /// Request path relative to the API base URL.
    pub path: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Resource version the client based this write on, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_version: Option<u64>,
}

impl Mutation {
    /// Creates a mutation with no base version.
    pub fn new(
        operation: impl Into<String>,
        method: HttpMethod,
        path: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Mutation {
            operation: operation.into(),
            method,
            path: path.into(),
            payload,
            base_version: None,
        }
    }

    /// Sets the resource version this write was based on.
    pub fn with_base_version(mut self, version: u64) -> Self {
        self.base_version = Some(version);
        self
    }

    /// Validates that the mutation can be delivered.
    pub fn validate(&self) -> Result<()> {
        if self.operation.trim().is_empty() {
            return Err(Error::InvalidInput("operation cannot be empty".to_string()));
        }
        if !self.path.starts_with('/') {
            return Err(Error::InvalidInput(format!(
                "path must start with '/': {}",
                self.path
            )));
        }
        Ok(())
    }
}

/// A queued mutation with its delivery bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfflineMutation {
    pub id: MutationId,
    #[serde(flatten)]
    pub mutation: Mutation,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub retry_count: u32,
    pub status: MutationStatus,
    /// Server's current resource version, attached on conflict.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_version: Option<u64>,
    /// Server's current resource state, attached on conflict.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_state: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Earliest time the next automatic attempt may run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_attempt_at: Option<DateTime<Utc>>,
}

impl OfflineMutation {
    /// Creates a pending record with a fresh id.
    pub fn new(mutation: Mutation, created_at: DateTime<Utc>) -> Self {
        Self::with_id(MutationId::generate(), mutation, created_at)
    }

    /// Creates a pending record with a caller-supplied id.
    pub fn with_id(id: MutationId, mutation: Mutation, created_at: DateTime<Utc>) -> Self {
        OfflineMutation {
            id,
            mutation,
            created_at,
            retry_count: 0,
            status: MutationStatus::Pending,
            server_version: None,
            server_state: None,
            last_error: None,
            next_attempt_at: None,
        }
    }

    /// Returns true if the backoff window has elapsed at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_attempt_at.is_none_or(|at| at <= now)
    }

    pub fn mark_syncing(&mut self) {
        self.status = MutationStatus::Syncing;
    }

    /// Records a failed attempt and schedules the next one.
    pub fn mark_failed(&mut self, error: impl Into<String>, next_attempt_at: DateTime<Utc>) {
        self.status = MutationStatus::Failed;
        self.retry_count = self.retry_count.saturating_add(1);
        self.last_error = Some(error.into());
        self.next_attempt_at = Some(next_attempt_at);
    }

    /// Records a version conflict with the server's current state.
    pub fn mark_conflict(
        &mut self,
        server_version: Option<u64>,
        server_state: Option<serde_json::Value>,
    ) {
        self.status = MutationStatus::Conflict;
        self.server_version = server_version;
        self.server_state = server_state;
        self.last_error = Some("version conflict".to_string());
        self.next_attempt_at = None;
    }

    /// Returns the record to pending without touching its retry count.
    pub fn reset_pending(&mut self) {
        self.status = MutationStatus::Pending;
        self.next_attempt_at = None;
    }

    /// Re-bases a conflicted write on the server's version and re-queues it.
    pub fn rebase_on_server(&mut self) {
        if let Some(version) = self.server_version {
            self.mutation.base_version = Some(version);
        }
        self.server_version = None;
        self.server_state = None;
        self.last_error = None;
        self.retry_count = 0;
        self.reset_pending();
    }
}

#[cfg(test)]
#[path = "mutation_tests.rs"]
mod tests;
