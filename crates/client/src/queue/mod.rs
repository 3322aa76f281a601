// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Durable queue of writes awaiting delivery.
//!
//! Records live in a JSONL file guarded by an exclusive lock file and are
//! delivered oldest first through the request interceptor.

mod offline;
mod store;

pub use offline::{OfflineMutationQueue, ProcessReport, QueueConfig, QueueStats, Resolution};
pub use store::QueueStore;

use thiserror::Error;
use till_core::{MutationId, MutationStatus};

use crate::auth::AuthError;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Storage(#[from] till_core::Error),

    #[error("queue file {0} is locked by another process")]
    Locked(String),

    #[error("mutation {0} is already queued")]
    Duplicate(MutationId),

    #[error("mutation not found: {0}\n  hint: run 'till-sync list' to see queued ids")]
    NotFound(String),

    #[error("mutation {id} is {status}, not in conflict")]
    NotInConflict { id: MutationId, status: MutationStatus },

    #[error(transparent)]
    Auth(#[from] AuthError),
}

pub type QueueResult<T> = std::result::Result<T, QueueError>;
