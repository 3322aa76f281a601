// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Authenticated realtime socket with reconnection.

mod connection;
mod transport;

pub use connection::{
    RealtimeConfig, RealtimeConnection, RealtimeEvent, RealtimeExit, RealtimeSession, SessionState,
};
pub use transport::{Transport, TransportError, TransportEvent, TransportFuture, TransportResult, WebSocketTransport};
