// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! till-core: Shared records for the till-sync resilience layer
//!
//! This crate provides the data model (tokens, offline mutations, connectivity,
//! realtime close signals) and the persistence primitives used by the
//! `tillsync` client library and its operator CLI.

pub mod clock;
pub mod close;
pub mod connectivity;
pub mod error;
pub mod jsonl;
pub mod mutation;
pub mod token;

pub use clock::{ClockSource, SystemClock};
pub use close::{CloseClassifier, CloseSignal};
pub use connectivity::ConnectionState;
pub use error::{Error, Result};
pub use mutation::{HttpMethod, Mutation, MutationId, MutationStatus, OfflineMutation};
pub use token::Token;
