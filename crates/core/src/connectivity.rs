// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Device connectivity snapshot.

use serde::{Deserialize, Serialize};

/// Current connectivity as reported by the OS.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectionState {
    pub is_online: bool,
    /// Network kind reported by the OS (`wifi`, `cellular`, ...), if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_type: Option<String>,
}

impl ConnectionState {
    pub fn online(network_type: impl Into<String>) -> Self {
        ConnectionState {
            is_online: true,
            network_type: Some(network_type.into()),
        }
    }

    pub fn offline() -> Self {
        ConnectionState {
            is_online: false,
            network_type: None,
        }
    }
}
