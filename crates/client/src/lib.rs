// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tillsync - client-side resilience layer for the till point-of-sale app.
//!
//! This crate keeps a point-of-sale client working through flaky
//! connectivity and expiring credentials.
//!
//! # Main Components
//!
//! - [`TokenManager`] - Owns the session token; one shared refresh for any
//!   number of concurrent callers
//! - [`RequestInterceptor`] - Authenticated HTTP calls that survive a `401` by
//!   refreshing once and replaying queued calls in order
//! - [`OfflineMutationQueue`] - Durable FIFO of writes awaiting delivery
//! - [`RealtimeConnection`] - WebSocket channel that tells credential
//!   rejections apart from network drops
//! - [`SyncCoordinator`] - One observable summary plus sync actions
//!
//! # Wiring
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tillsync::{NetworkObserver, OfflineMutationQueue, RequestInterceptor, RestBackend, SyncCoordinator, TokenManager};
//!
//! let backend = Arc::new(RestBackend::new(base_url, "/auth/refresh", timeout)?);
//! let tokens = TokenManager::new(backend.clone(), Default::default());
//! let interceptor = RequestInterceptor::new(backend, tokens.clone(), Default::default());
//! let queue = Arc::new(OfflineMutationQueue::open(&path, interceptor, Default::default())?);
//! let network = NetworkObserver::new(ConnectionState::online("wifi"));
//! let sync = Arc::new(SyncCoordinator::new(queue, network.subscribe()));
//! sync.spawn(cancel);
//! ```

mod cli;
mod commands;

pub mod auth;
pub mod backoff;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod http;
pub mod network;
pub mod queue;
pub mod realtime;
pub mod session;

#[cfg(test)]
mod test_helpers;

pub use auth::{AuthError, TokenConfig, TokenManager, TokenRefresher};
pub use cli::{Cli, Command, GlobalArgs};
pub use config::Config;
pub use coordinator::{SyncCoordinator, SyncSummary};
pub use error::{Error, Result};
pub use events::{ClearReason, EventBus, TokenEvent};
pub use http::{ApiError, ApiRequest, ApiResponse, HttpBackend, InterceptorConfig, RequestInterceptor, RestBackend};
pub use network::NetworkObserver;
pub use queue::{OfflineMutationQueue, QueueConfig, QueueError, QueueStats, Resolution};
pub use realtime::{RealtimeConfig, RealtimeConnection, RealtimeEvent, RealtimeExit, RealtimeSession};
pub use session::SessionFile;

use commands::Context;

/// Execute a CLI invocation. This is the main entry point for the binary and
/// a testable way to run commands without process execution.
pub fn run(cli: Cli) -> Result<()> {
    let ctx = Context::load(&cli.global)?;
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| Error::Io(std::io::Error::other(format!("tokio: {}", e))))?;

    match cli.command {
        Command::Login {
            access_token,
            refresh_token,
            expires_at,
        } => commands::session::login(&ctx, access_token, refresh_token, expires_at),
        Command::Logout => commands::session::logout(&ctx),
        Command::Status { json } => commands::queue::status(&ctx, json),
        Command::List { status, json } => commands::queue::list(&ctx, status, json),
        Command::Enqueue {
            operation,
            method,
            path,
            payload,
            base_version,
            now,
        } => rt.block_on(commands::queue::enqueue(
            &ctx,
            operation,
            method,
            path,
            payload,
            base_version,
            now,
        )),
        Command::Sync => rt.block_on(commands::queue::sync(&ctx)),
        Command::Retry => rt.block_on(commands::queue::retry(&ctx)),
        Command::Clear { yes } => commands::queue::clear(&ctx, yes),
        Command::Resolve { id, keep_local, .. } => commands::queue::resolve(&ctx, &id, keep_local),
        Command::Watch => rt.block_on(commands::watch::run(&ctx)),
    }
}
