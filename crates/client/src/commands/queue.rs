// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Offline queue commands.

use chrono::{DateTime, Utc};
use serde::Serialize;
use till_core::{HttpMethod, Mutation, MutationStatus, OfflineMutation};

use super::Context;
use crate::coordinator::SyncSummary;
use crate::error::Result;
use crate::queue::{ProcessReport, Resolution};

#[derive(Serialize)]
struct StatusReport {
    #[serde(flatten)]
    summary: SyncSummary,
    network_type: Option<String>,
    has_session: bool,
    expires_at: Option<u64>,
}

pub fn status(ctx: &Context, json: bool) -> Result<()> {
    let summary = ctx.coordinator()?.summary();
    let network = ctx.network.current();
    let token = ctx.tokens.token();
    let report = StatusReport {
        summary,
        network_type: network.network_type.clone(),
        has_session: token.is_some(),
        expires_at: token.as_ref().map(|t| t.expires_at),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    match &report.network_type {
        Some(kind) if summary.is_online => println!("Network: online ({})", kind),
        _ if summary.is_online => println!("Network: online"),
        _ => println!("Network: offline"),
    }
    match report.expires_at {
        Some(ts) => println!("Session: active (expires {})", format_epoch(ts)),
        None => println!("Session: none"),
    }
    println!("Queued: {}", summary.queue_size);
    println!("Failed: {}", summary.failed_count);
    println!("Conflicts: {}", summary.conflict_count);
    if summary.conflict_count > 0 {
        println!();
        println!("Run 'till-sync list --status conflict' to review conflicts.");
    }
    Ok(())
}

pub fn list(ctx: &Context, status: Option<String>, json: bool) -> Result<()> {
    let filter = status.map(|s| s.parse::<MutationStatus>()).transpose()?;
    let queue = ctx.open_queue()?;
    let items: Vec<OfflineMutation> = queue
        .items()
        .into_iter()
        .filter(|i| filter.is_none_or(|s| i.status == s))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }
    if items.is_empty() {
        println!("No queued writes.");
        return Ok(());
    }
    for item in &items {
        println!("{}", format_item(item));
    }
    Ok(())
}

pub async fn enqueue(
    ctx: &Context,
    operation: String,
    method: String,
    path: String,
    payload: Option<String>,
    base_version: Option<u64>,
    now: bool,
) -> Result<()> {
    let method: HttpMethod = method.parse()?;
    let payload = match payload {
        Some(raw) => serde_json::from_str(&raw)?,
        None => serde_json::Value::Null,
    };
    let mut mutation = Mutation::new(operation, method, path, payload);
    if let Some(version) = base_version {
        mutation = mutation.with_base_version(version);
    }

    let coordinator = ctx.coordinator()?;
    if !now {
        let id = coordinator.queue().enqueue(mutation)?;
        println!("Queued {}", id);
        return Ok(());
    }
    let id = coordinator.submit(mutation).await?;
    match coordinator.queue().get(id) {
        None => println!("Delivered {}", id),
        Some(item) => println!("Queued {} ({})", id, item.status),
    }
    Ok(())
}

pub async fn sync(ctx: &Context) -> Result<()> {
    let coordinator = ctx.coordinator()?;
    let report = coordinator.trigger_sync().await?;
    print_report(&report);
    Ok(())
}

pub async fn retry(ctx: &Context) -> Result<()> {
    let coordinator = ctx.coordinator()?;
    let report = coordinator.retry_failed().await?;
    print_report(&report);
    Ok(())
}

pub fn clear(ctx: &Context, yes: bool) -> Result<()> {
    let coordinator = ctx.coordinator()?;
    let queued = coordinator.queue().items().len();
    if !yes {
        println!("Refusing to drop {} queued writes without --yes.", queued);
        return Ok(());
    }
    let removed = coordinator.clear_queue()?;
    println!("Dropped {} queued writes.", removed);
    Ok(())
}

pub fn resolve(ctx: &Context, id: &str, keep_local: bool) -> Result<()> {
    let coordinator = ctx.coordinator()?;
    let id = coordinator.queue().find(id)?;
    let resolution = if keep_local {
        Resolution::KeepLocal
    } else {
        Resolution::DiscardLocal
    };
    coordinator.resolve_conflict(id, resolution)?;
    match resolution {
        Resolution::KeepLocal => println!("Re-queued {} on the server's version.", id.short()),
        Resolution::DiscardLocal => println!("Discarded {}.", id.short()),
    }
    Ok(())
}

fn print_report(report: &ProcessReport) {
    if report.skipped {
        println!("A sync pass is already running.");
        return;
    }
    if report.attempted == 0 {
        println!("Nothing to deliver.");
        return;
    }
    println!(
        "Delivered {} of {} ({} failed, {} conflicts)",
        report.delivered,
        report.attempted,
        report.failed,
        report.conflicts.len()
    );
    for id in &report.conflicts {
        println!("  conflict: {} (run 'till-sync resolve {}')", id, id.short());
    }
}

fn format_item(item: &OfflineMutation) -> String {
    let mut line = format!(
        "{}  {:<8}  {:<6} {}  {}",
        item.id.short(),
        item.status.as_str(),
        item.mutation.method.as_str(),
        item.mutation.path,
        item.mutation.operation
    );
    if item.retry_count > 0 {
        line.push_str(&format!("  retries={}", item.retry_count));
    }
    if let Some(version) = item.server_version {
        line.push_str(&format!("  server_version={}", version));
    }
    if let Some(err) = &item.last_error {
        line.push_str(&format!("  error: {}", err));
    }
    line
}

fn format_epoch(secs: u64) -> String {
    i64::try_from(secs)
        .ok()
        .and_then(|s| DateTime::<Utc>::from_timestamp(s, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| secs.to_string())
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
