// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Token pair persisted between CLI invocations.
//!
//! The file mirrors the token manager: a listener rewrites it whenever a
//! session is established or refreshed and removes it when the session is
//! cleared.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use till_core::Token;
use tracing::{debug, warn};

use crate::auth::TokenManager;
use crate::error::Result;
use crate::events::TokenEvent;

const LISTENER_KEY: &str = "session-file";

#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SessionFile { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored token pair, if any.
    pub fn load(&self) -> Result<Option<Token>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Writes the token pair via a temp file and rename.
    pub fn save(&self, token: &Token) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            serde_json::to_writer_pretty(&mut file, token)?;
            file.write_all(b"\n")?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub fn remove(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    /// Keeps the file in step with `tokens`. Attaching twice is a no-op.
    pub fn attach(&self, tokens: &TokenManager) -> bool {
        let file = self.clone();
        tokens.events().subscribe(LISTENER_KEY, move |event: &TokenEvent| {
            let result = match event {
                TokenEvent::Established(token) | TokenEvent::Refreshed(token) => file.save(token),
                TokenEvent::Cleared(_) => file.remove(),
            };
            match result {
                Ok(()) => debug!(event = event.name(), path = %file.path.display(), "session file updated"),
                Err(e) => warn!(event = event.name(), error = %e, "could not update session file"),
            }
        })
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
