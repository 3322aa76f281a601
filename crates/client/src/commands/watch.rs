// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Realtime watch command.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::Context;
use crate::error::{Error, Result};
use crate::realtime::{RealtimeConnection, RealtimeEvent, RealtimeExit};

/// Runs the realtime connection until Ctrl-C, printing events.
///
/// An auth rejection is answered with one forced token refresh; a second
/// rejection ends the command.
pub async fn run(ctx: &Context) -> Result<()> {
    let config = ctx.config.realtime_config().ok_or_else(|| {
        Error::Config("no [realtime] section in config\n  hint: set realtime.url to a ws:// or wss:// endpoint".to_string())
    })?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let mut refreshed = false;
    loop {
        let (tx, rx) = mpsc::channel(64);
        let mut conn =
            RealtimeConnection::new(config.clone(), ctx.tokens.clone(), ctx.network.subscribe()).with_events(tx);
        let printer = tokio::spawn(print_events(rx));
        let exit = conn.run(cancel.clone()).await;
        drop(conn);
        let _ = printer.await;

        match exit {
            RealtimeExit::Cancelled => return Ok(()),
            RealtimeExit::AuthRejected(signal) if !refreshed => {
                info!(close = %signal, "credential rejected, refreshing before reconnecting");
                refreshed = true;
                ctx.tokens.refresh_auth_token().await?;
            }
            RealtimeExit::AuthRejected(signal) => return Err(Error::RealtimeRejected(signal.to_string())),
            RealtimeExit::SessionEnded(e) => return Err(e.into()),
            RealtimeExit::RetriesExhausted { attempts } => {
                return Err(Error::Network(format!(
                    "realtime connection failed after {} attempts",
                    attempts
                )))
            }
        }
    }
}

async fn print_events(mut rx: mpsc::Receiver<RealtimeEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            RealtimeEvent::Connecting { attempt } => println!("connecting (attempt {})", attempt),
            RealtimeEvent::Open => println!("open"),
            RealtimeEvent::Message(text) => println!("message: {}", text),
            RealtimeEvent::Closed { signal, is_auth_error } => {
                let kind = if is_auth_error { "auth" } else { "network" };
                println!("closed: {} [{}]", signal, kind);
            }
        }
    }
}
