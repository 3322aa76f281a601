// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use till_core::{jsonl, OfflineMutation};

use super::{QueueError, QueueResult};

/// JSONL file of queued records, held under an exclusive lock.
///
/// The lock is released when the store is dropped.
#[derive(Debug)]
pub struct QueueStore {
    path: PathBuf,
    _lock: File,
}

impl QueueStore {
    /// Opens the store at `path`, creating parent directories.
    ///
    /// Fails with [`QueueError::Locked`] if another handle holds the queue.
    pub fn open(path: &Path) -> QueueResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let lock_path = lock_path(path);
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)?;
        lock.try_lock_exclusive()
            .map_err(|_| QueueError::Locked(path.display().to_string()))?;
        Ok(QueueStore {
            path: path.to_path_buf(),
            _lock: lock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> QueueResult<Vec<OfflineMutation>> {
        Ok(jsonl::read_all(&self.path)?)
    }

    pub fn append(&self, record: &OfflineMutation) -> QueueResult<()> {
        Ok(jsonl::append(&self.path, record)?)
    }

    /// Atomically replaces the file with `records`.
    pub fn save(&self, records: &[OfflineMutation]) -> QueueResult<()> {
        Ok(jsonl::write_all(&self.path, records)?)
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".lock");
    path.with_file_name(name)
}
