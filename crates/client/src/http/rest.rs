// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use reqwest::header::{HeaderValue, IF_MATCH};
use serde_json::{json, Value};
use till_core::Token;
use url::Url;

use super::{ApiError, ApiRequest, ApiResponse, BackendFuture, HttpBackend, RequestMethod};
use crate::auth::{RefreshError, RefreshFuture, TokenRefresher};

const IDEMPOTENCY_KEY: &str = "Idempotency-Key";

/// `reqwest` implementation of the API and refresh endpoints.
#[derive(Debug, Clone)]
pub struct RestBackend {
    client: reqwest::Client,
    base_url: Url,
    refresh_path: String,
}

impl RestBackend {
    pub fn new(base_url: Url, refresh_path: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("till-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(RestBackend {
            client,
            base_url,
            refresh_path: refresh_path.into(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Joins `path` onto the base URL, keeping any path prefix the base has.
    pub fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Url::parse(&format!("{base}/{path}"))
            .map_err(|e| ApiError::InvalidRequest(format!("bad request path '{path}': {e}")))
    }

    async fn send_request(&self, request: &ApiRequest, access_token: &str) -> Result<ApiResponse, ApiError> {
        let url = self.endpoint(&request.path)?;
        let method = match request.method {
            RequestMethod::Get => reqwest::Method::GET,
            RequestMethod::Post => reqwest::Method::POST,
            RequestMethod::Put => reqwest::Method::PUT,
            RequestMethod::Patch => reqwest::Method::PATCH,
            RequestMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, url).bearer_auth(access_token);
        if let Some(key) = &request.idempotency_key {
            builder = builder.header(IDEMPOTENCY_KEY, key);
        }
        if let Some(version) = request.base_version {
            let etag = HeaderValue::from_str(&format!("\"{version}\""))
                .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
            builder = builder.header(IF_MATCH, etag);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(network_error)?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(network_error)?;
        Ok(ApiResponse::new(status, decode_body(&text)))
    }

    async fn exchange(&self, refresh_token: &str) -> Result<Token, RefreshError> {
        let url = self
            .endpoint(&self.refresh_path)
            .map_err(|e| RefreshError::Network(e.to_string()))?;
        let response = self
            .client
            .post(url)
            .json(&json!({ "refreshToken": refresh_token }))
            .send()
            .await
            .map_err(|e| RefreshError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| RefreshError::Network(e.to_string()))?;

        match status {
            200..=299 => serde_json::from_str::<Token>(&text)
                .map_err(|e| RefreshError::Network(format!("malformed refresh response: {e}"))),
            400 | 401 | 403 => Err(RefreshError::Rejected(
                ApiResponse::new(status, decode_body(&text)).message(),
            )),
            _ => Err(RefreshError::Network(format!("refresh endpoint returned HTTP {status}"))),
        }
    }
}

impl HttpBackend for RestBackend {
    fn send<'a>(&'a self, request: &'a ApiRequest, access_token: &'a str) -> BackendFuture<'a> {
        Box::pin(self.send_request(request, access_token))
    }
}

impl TokenRefresher for RestBackend {
    fn refresh<'a>(&'a self, refresh_token: &'a str) -> RefreshFuture<'a> {
        Box::pin(self.exchange(refresh_token))
    }
}

/// Decodes a response body: JSON if it parses, otherwise the raw text.
pub(crate) fn decode_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn network_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Network(format!("request timed out: {err}"))
    } else {
        ApiError::Network(err.to_string())
    }
}
