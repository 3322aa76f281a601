// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! JSONL (JSON Lines) file utilities.
//!
//! Durable storage for JSON-serializable records, one record per line, with
//! fsync after every write. Full rewrites go through a temp file and rename
//! so a crash mid-write leaves either the old or the new content.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Error, Result};

/// Appends a record to a JSONL file with fsync for durability.
pub fn append<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;

    let json = serde_json::to_string(record)?;
    writeln!(file, "{json}")?;
    file.sync_all()?;

    Ok(())
}

/// Reads all records from a JSONL file.
///
/// Skips blank lines and returns an empty vec if the file doesn't exist.
/// A line that fails to parse is reported with its line number.
pub fn read_all<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let reader = BufReader::new(file);
    let mut records = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: T = serde_json::from_str(&line).map_err(|e| {
            Error::CorruptedData(format!("{} line {}: {}", path.display(), index + 1, e))
        })?;
        records.push(record);
    }

    Ok(records)
}

/// Writes all records to a JSONL file, atomically replacing existing content.
pub fn write_all<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let tmp_path = temp_path(path);
    {
        let mut file = File::create(&tmp_path)?;
        for record in records {
            let json = serde_json::to_string(record)?;
            writeln!(file, "{json}")?;
        }
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;

    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
#[path = "jsonl_tests.rs"]
mod tests;
