// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};

/// Parse a string that must not be empty or whitespace-only.
fn non_empty_string(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        Err("cannot be empty".to_string())
    } else {
        Ok(s.to_string())
    }
}

#[derive(Parser)]
#[command(name = "till-sync")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Inspect and drive the till offline sync queue and realtime channel")]
#[command(
    long_about = "Inspect and drive the till offline sync queue and realtime channel.\n\n\
    Writes made while offline are kept in a local queue and delivered in order once the \
    API is reachable. The session token is refreshed automatically."
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Config file (default: <config dir>/till-sync/config.toml)
    #[arg(long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    /// Directory holding the queue and session files (default: $TILL_SYNC_STATE_DIR or <data dir>/till-sync)
    #[arg(long, global = true, value_name = "path")]
    pub state_dir: Option<PathBuf>,

    /// Treat the device as offline (writes are only queued)
    #[arg(long, global = true)]
    pub offline: bool,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Install a session token pair
    #[command(after_help = "\
Examples:
  till-sync login --access-token eyJ... --refresh-token r1 --expires-at 1767225600")]
    Login {
        #[arg(long, value_parser = non_empty_string)]
        access_token: String,

        #[arg(long, value_parser = non_empty_string)]
        refresh_token: String,

        /// Access token expiry in seconds since Unix epoch
        #[arg(long)]
        expires_at: u64,
    },

    /// Forget the stored session
    Logout,

    /// Show connectivity, session and queue counters
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// List queued writes
    List {
        /// Only show writes with this status (pending, syncing, failed, conflict)
        #[arg(long, short)]
        status: Option<String>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Queue a write for delivery
    #[command(after_help = "\
Examples:
  till-sync enqueue orders.create POST /orders --payload '{\"total\": 1250}'
  till-sync enqueue orders.update PUT /orders/42 --payload '{\"total\": 900}' --base-version 3
  till-sync enqueue orders.void DELETE /orders/42 --now")]
    Enqueue {
        /// Logical operation name (e.g. orders.create)
        #[arg(value_parser = non_empty_string)]
        operation: String,

        /// HTTP method (POST, PUT, PATCH, DELETE)
        method: String,

        /// Request path relative to the API base URL
        path: String,

        /// JSON request body
        #[arg(long)]
        payload: Option<String>,

        /// Resource version the write is based on
        #[arg(long)]
        base_version: Option<u64>,

        /// Deliver right away when online
        #[arg(long)]
        now: bool,
    },

    /// Deliver pending writes and failed writes that are due
    Sync,

    /// Re-attempt every failed write now (conflicts are skipped)
    Retry,

    /// Drop every queued write
    Clear {
        /// Confirm dropping writes that were never delivered
        #[arg(long)]
        yes: bool,
    },

    /// Settle a write the server rejected as conflicting
    #[command(group(ArgGroup::new("resolution").required(true).args(["keep_local", "discard"])))]
    Resolve {
        /// Write id or unique id prefix
        id: String,

        /// Re-send the local write on top of the server's version
        #[arg(long)]
        keep_local: bool,

        /// Drop the local write and keep the server's state
        #[arg(long)]
        discard: bool,
    },

    /// Connect to the realtime channel and print what arrives
    Watch,
}
