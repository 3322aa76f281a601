// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde_json::Value;
use till_core::{HttpMethod, OfflineMutation};

use super::ApiError;

/// Request method, including reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl RequestMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestMethod::Get => "GET",
            RequestMethod::Post => "POST",
            RequestMethod::Put => "PUT",
            RequestMethod::Patch => "PATCH",
            RequestMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for RequestMethod {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Post => RequestMethod::Post,
            HttpMethod::Put => RequestMethod::Put,
            HttpMethod::Patch => RequestMethod::Patch,
            HttpMethod::Delete => RequestMethod::Delete,
        }
    }
}

/// An authenticated API call, minus its credential.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: RequestMethod,
    /// Path relative to the API base URL.
    pub path: String,
    pub body: Option<Value>,
    /// Sent as `Idempotency-Key` so a replayed write is applied once.
    pub idempotency_key: Option<String>,
    /// Sent as `If-Match` for optimistic concurrency.
    pub base_version: Option<u64>,
}

impl ApiRequest {
    pub fn new(method: RequestMethod, path: impl Into<String>) -> Self {
        ApiRequest {
            method,
            path: path.into(),
            body: None,
            idempotency_key: None,
            base_version: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(RequestMethod::Get, path)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Builds the delivery request for a queued mutation.
    pub fn for_mutation(record: &OfflineMutation) -> Self {
        let mutation = &record.mutation;
        let body = if mutation.payload.is_null() {
            None
        } else {
            Some(mutation.payload.clone())
        };
        ApiRequest {
            method: mutation.method.into(),
            path: mutation.path.clone(),
            body,
            idempotency_key: Some(record.id.to_string()),
            base_version: mutation.base_version,
        }
    }
}

/// Status and decoded body of a completed call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// JSON body, `Value::Null` when empty, or a string when not JSON.
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        ApiResponse { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// Version conflict (`409 Conflict` or `412 Precondition Failed`).
    pub fn is_conflict(&self) -> bool {
        matches!(self.status, 409 | 412)
    }

    /// Worth retrying later: timeouts, throttling and server errors.
    pub fn is_retryable(&self) -> bool {
        matches!(self.status, 408 | 429) || self.status >= 500
    }

    /// Server's error message, if the body carries one.
    pub fn message(&self) -> String {
        match &self.body {
            Value::String(s) if !s.is_empty() => s.clone(),
            Value::Object(map) => map
                .get("message")
                .or_else(|| map.get("error"))
                .and_then(Value::as_str)
                .map_or_else(|| format!("HTTP {}", self.status), str::to_string),
            _ => format!("HTTP {}", self.status),
        }
    }
}

pub type BackendFuture<'a> = Pin<Box<dyn Future<Output = Result<ApiResponse, ApiError>> + Send + 'a>>;

/// Sends one authenticated call. Implementations do not retry.
pub trait HttpBackend: Send + Sync {
    fn send<'a>(&'a self, request: &'a ApiRequest, access_token: &'a str) -> BackendFuture<'a>;
}
