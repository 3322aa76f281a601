// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use till_core::{ClockSource, Mutation, MutationId, MutationStatus, OfflineMutation, SystemClock};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{QueueError, QueueResult, QueueStore};
use crate::auth::AuthError;
use crate::backoff::Backoff;
use crate::http::{ApiError, ApiRequest, ApiResponse, RequestInterceptor};

/// Delivery knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Bound on one delivery attempt, including any token refresh.
    pub item_timeout: Duration,
    /// Failed records stop being retried automatically after this many attempts.
    pub max_auto_retries: u32,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        QueueConfig {
            item_timeout: Duration::from_secs(15),
            max_auto_retries: 5,
            retry_base_delay: Duration::from_secs(1),
            retry_max_delay: Duration::from_secs(300),
        }
    }
}

/// Record counts by status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct QueueStats {
    pub queue_size: usize,
    pub pending_count: usize,
    pub syncing_count: usize,
    pub failed_count: usize,
    pub conflict_count: usize,
    /// A delivery pass is running.
    pub processing: bool,
}

/// Outcome of one delivery pass.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ProcessReport {
    /// Another pass was already running; nothing was attempted.
    pub skipped: bool,
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
    pub conflicts: Vec<MutationId>,
}

/// How to settle a conflicted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Re-base the write on the server's version and deliver it again.
    KeepLocal,
    /// Drop the write and accept the server's state.
    DiscardLocal,
}

enum Verdict {
    Delivered,
    Conflict {
        server_version: Option<u64>,
        server_state: Option<Value>,
    },
    Retryable(String),
    Rejected(String),
    /// The session is gone; stop the pass.
    SessionEnded(AuthError),
}

/// Persistent FIFO of offline writes.
pub struct OfflineMutationQueue {
    store: QueueStore,
    items: Mutex<Vec<OfflineMutation>>,
    interceptor: RequestInterceptor,
    clock: Arc<dyn ClockSource>,
    config: QueueConfig,
    backoff: Backoff,
    processing: tokio::sync::Mutex<()>,
    busy: AtomicBool,
    stats_tx: watch::Sender<QueueStats>,
}

impl OfflineMutationQueue {
    pub fn open(path: &Path, interceptor: RequestInterceptor, config: QueueConfig) -> QueueResult<Self> {
        Self::with_clock(path, interceptor, Arc::new(SystemClock), config)
    }

    /// Opens the queue at `path`.
    ///
    /// Records left `syncing` by an interrupted run go back to pending.
    pub fn with_clock(
        path: &Path,
        interceptor: RequestInterceptor,
        clock: Arc<dyn ClockSource>,
        config: QueueConfig,
    ) -> QueueResult<Self> {
        let store = QueueStore::open(path)?;
        let mut items = store.load()?;

        let mut recovered = 0;
        for item in items.iter_mut().filter(|i| i.status == MutationStatus::Syncing) {
            item.reset_pending();
            recovered += 1;
        }
        if recovered > 0 {
            warn!(recovered, "re-queued interrupted deliveries");
            store.save(&items)?;
        }

        let backoff = Backoff::new(config.retry_base_delay, config.retry_max_delay);
        let stats = compute_stats(&items);
        let (stats_tx, _) = watch::channel(stats);
        debug!(path = %path.display(), queued = items.len(), "opened mutation queue");

        Ok(OfflineMutationQueue {
            store,
            items: Mutex::new(items),
            interceptor,
            clock,
            config,
            backoff,
            processing: tokio::sync::Mutex::new(()),
            busy: AtomicBool::new(false),
            stats_tx,
        })
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn interceptor(&self) -> &RequestInterceptor {
        &self.interceptor
    }

    /// Queues a write under a fresh id.
    pub fn enqueue(&self, mutation: Mutation) -> QueueResult<MutationId> {
        let record = OfflineMutation::new(mutation, self.clock.now_utc());
        self.enqueue_record(record)
    }

    /// Queues a write under a caller-chosen id.
    pub fn enqueue_record(&self, record: OfflineMutation) -> QueueResult<MutationId> {
        record.mutation.validate()?;
        let id = record.id;
        let mut items = self.lock_items();
        if items.iter().any(|i| i.id == id) {
            return Err(QueueError::Duplicate(id));
        }
        self.store.append(&record)?;
        info!(id = %id.short(), operation = %record.mutation.operation, "queued mutation");
        items.push(record);
        self.publish(&items);
        Ok(id)
    }

    /// Snapshot of all records in queue order.
    pub fn items(&self) -> Vec<OfflineMutation> {
        self.lock_items().clone()
    }

    pub fn get(&self, id: MutationId) -> Option<OfflineMutation> {
        self.lock_items().iter().find(|i| i.id == id).cloned()
    }

    /// Finds a record by full id or unique id prefix.
    pub fn find(&self, prefix: &str) -> QueueResult<MutationId> {
        let items = self.lock_items();
        let matches: Vec<MutationId> = items
            .iter()
            .filter(|i| i.id.to_string().starts_with(prefix))
            .map(|i| i.id)
            .collect();
        match matches.as_slice() {
            [id] => Ok(*id),
            _ => Err(QueueError::NotFound(prefix.to_string())),
        }
    }

    pub fn stats(&self) -> QueueStats {
        *self.stats_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<QueueStats> {
        self.stats_tx.subscribe()
    }

    /// Returns true while a delivery pass is running.
    pub fn is_processing(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Delivers pending records and due failed records, oldest first.
    ///
    /// Returns a skipped report if a pass is already running. A terminal
    /// authentication failure returns the record to pending and ends the
    /// pass with an error.
    pub async fn process_queue(&self) -> QueueResult<ProcessReport> {
        let Ok(_guard) = self.processing.try_lock() else {
            debug!("delivery pass already running");
            return Ok(ProcessReport {
                skipped: true,
                ..ProcessReport::default()
            });
        };
        let now = self.clock.now_utc();
        let max = self.config.max_auto_retries;
        let ids = self.select(|i| match i.status {
            MutationStatus::Pending => true,
            MutationStatus::Failed => i.retry_count < max && i.is_due(now),
            MutationStatus::Syncing | MutationStatus::Conflict => false,
        });
        self.deliver_all(ids).await
    }

    /// Re-attempts every failed record now, ignoring backoff and the retry
    /// limit. Conflicted records are left alone.
    pub async fn retry_failed(&self) -> QueueResult<ProcessReport> {
        let Ok(_guard) = self.processing.try_lock() else {
            return Ok(ProcessReport {
                skipped: true,
                ..ProcessReport::default()
            });
        };
        let ids = self.select(|i| i.status == MutationStatus::Failed);
        info!(count = ids.len(), "retrying failed mutations");
        self.deliver_all(ids).await
    }

    /// Delivers one record immediately, waiting for any running pass.
    pub async fn deliver_now(&self, id: MutationId) -> QueueResult<ProcessReport> {
        let _guard = self.processing.lock().await;
        if self.get(id).is_none() {
            return Err(QueueError::NotFound(id.to_string()));
        }
        self.deliver_all(vec![id]).await
    }

    /// Drops every record. Returns how many were removed.
    pub fn clear_queue(&self) -> QueueResult<usize> {
        let mut items = self.lock_items();
        let removed = items.len();
        self.store.save(&[])?;
        items.clear();
        self.publish(&items);
        warn!(removed, "cleared mutation queue");
        Ok(removed)
    }

    /// Settles a conflicted record.
    pub fn resolve_conflict(&self, id: MutationId, resolution: Resolution) -> QueueResult<()> {
        let mut items = self.lock_items();
        let pos = items
            .iter()
            .position(|i| i.id == id)
            .ok_or_else(|| QueueError::NotFound(id.to_string()))?;
        let status = items[pos].status;
        if status != MutationStatus::Conflict {
            return Err(QueueError::NotInConflict { id, status });
        }
        let mut next = items.clone();
        match resolution {
            Resolution::KeepLocal => {
                next[pos].rebase_on_server();
            }
            Resolution::DiscardLocal => {
                next.remove(pos);
            }
        }
        self.store.save(&next)?;
        *items = next;
        self.publish(&items);
        match resolution {
            Resolution::KeepLocal => info!(id = %id.short(), "kept local change"),
            Resolution::DiscardLocal => info!(id = %id.short(), "discarded local change"),
        }
        Ok(())
    }

    fn set_busy(&self, busy: bool) {
        self.busy.store(busy, Ordering::SeqCst);
        let items = self.lock_items();
        self.publish(&items);
    }

    fn lock_items(&self) -> MutexGuard<'_, Vec<OfflineMutation>> {
        self.items.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn select(&self, pick: impl Fn(&OfflineMutation) -> bool) -> Vec<MutationId> {
        self.lock_items().iter().filter(|i| pick(i)).map(|i| i.id).collect()
    }

    fn publish(&self, items: &[OfflineMutation]) {
        let stats = QueueStats {
            processing: self.is_processing(),
            ..compute_stats(items)
        };
        self.stats_tx.send_if_modified(|current| {
            if *current == stats {
                return false;
            }
            *current = stats;
            true
        });
    }

    /// Applies `f` to a copy of the records and persists it. Memory changes
    /// only once the save succeeds. Returns None if the record is gone.
    fn update<T>(&self, id: MutationId, f: impl FnOnce(&mut Vec<OfflineMutation>, usize) -> T) -> QueueResult<Option<T>> {
        let mut items = self.lock_items();
        let Some(pos) = items.iter().position(|i| i.id == id) else {
            return Ok(None);
        };
        let mut next = items.clone();
        let out = f(&mut next, pos);
        self.store.save(&next)?;
        *items = next;
        self.publish(&items);
        Ok(Some(out))
    }

    async fn deliver_all(&self, ids: Vec<MutationId>) -> QueueResult<ProcessReport> {
        let _busy = BusyFlag::raise(self);
        let mut report = ProcessReport::default();
        for id in ids {
            let request = self.update(id, |items, pos| {
                items[pos].mark_syncing();
                ApiRequest::for_mutation(&items[pos])
            })?;
            let Some(request) = request else {
                debug!(id = %id.short(), "mutation removed before delivery");
                continue;
            };

            report.attempted += 1;
            let verdict = self.attempt(request).await;
            let now = self.clock.now_utc();

            match verdict {
                Verdict::Delivered => {
                    self.update(id, |items, pos| {
                        items.remove(pos);
                    })?;
                    report.delivered += 1;
                    info!(id = %id.short(), "delivered mutation");
                }
                Verdict::Conflict {
                    server_version,
                    server_state,
                } => {
                    self.update(id, |items, pos| items[pos].mark_conflict(server_version, server_state))?;
                    report.conflicts.push(id);
                    warn!(id = %id.short(), ?server_version, "mutation conflicts with server state");
                }
                Verdict::Retryable(error) => {
                    let retries = self.update(id, |items, pos| {
                        let next = self.next_attempt(now, items[pos].retry_count);
                        items[pos].mark_failed(error.as_str(), next);
                        items[pos].retry_count
                    })?;
                    report.failed += 1;
                    warn!(id = %id.short(), retries = ?retries, error = %error, "delivery failed, will retry");
                }
                Verdict::Rejected(error) => {
                    let max = self.config.max_auto_retries;
                    self.update(id, |items, pos| {
                        items[pos].mark_failed(error.as_str(), now);
                        items[pos].retry_count = items[pos].retry_count.max(max);
                    })?;
                    report.failed += 1;
                    warn!(id = %id.short(), error = %error, "delivery rejected by server");
                }
                Verdict::SessionEnded(err) => {
                    self.update(id, |items, pos| items[pos].reset_pending())?;
                    warn!(error = %err, "session ended, stopping delivery");
                    return Err(QueueError::Auth(err));
                }
            }
        }
        if report.attempted > 0 {
            info!(
                attempted = report.attempted,
                delivered = report.delivered,
                failed = report.failed,
                conflicts = report.conflicts.len(),
                "delivery pass complete"
            );
        }
        Ok(report)
    }

    async fn attempt(&self, request: ApiRequest) -> Verdict {
        let outcome = tokio::time::timeout(self.config.item_timeout, self.interceptor.execute(request)).await;
        match outcome {
            Err(_) => Verdict::Retryable(format!(
                "delivery timed out after {}ms",
                self.config.item_timeout.as_millis()
            )),
            Ok(Ok(response)) => classify(&response),
            Ok(Err(ApiError::Auth(e))) if e.is_terminal() => Verdict::SessionEnded(e),
            Ok(Err(e)) if e.is_retryable() => Verdict::Retryable(e.to_string()),
            Ok(Err(e)) => Verdict::Rejected(e.to_string()),
        }
    }

    fn next_attempt(&self, now: DateTime<Utc>, retry_count: u32) -> DateTime<Utc> {
        let delay = self.backoff.delay(retry_count);
        chrono::Duration::from_std(delay).map_or(now, |d| now + d)
    }
}

/// Marks a delivery pass as running and publishes the change.
struct BusyFlag<'a>(&'a OfflineMutationQueue);

impl<'a> BusyFlag<'a> {
    fn raise(queue: &'a OfflineMutationQueue) -> Self {
        queue.set_busy(true);
        BusyFlag(queue)
    }
}

impl Drop for BusyFlag<'_> {
    fn drop(&mut self) {
        self.0.set_busy(false);
    }
}

fn classify(response: &ApiResponse) -> Verdict {
    if response.is_success() {
        return Verdict::Delivered;
    }
    if response.is_conflict() {
        let server_version = response.body.get("serverVersion").and_then(Value::as_u64);
        let server_state = response
            .body
            .get("current")
            .cloned()
            .or_else(|| (!response.body.is_null()).then(|| response.body.clone()));
        return Verdict::Conflict {
            server_version,
            server_state,
        };
    }
    if response.is_retryable() {
        return Verdict::Retryable(response.message());
    }
    Verdict::Rejected(response.message())
}

// Every record counts toward the queue size, conflicts included.
fn compute_stats(items: &[OfflineMutation]) -> QueueStats {
    let mut stats = QueueStats {
        queue_size: items.len(),
        ..QueueStats::default()
    };
    for item in items {
        match item.status {
            MutationStatus::Pending => stats.pending_count += 1,
            MutationStatus::Syncing => stats.syncing_count += 1,
            MutationStatus::Failed => stats.failed_count += 1,
            MutationStatus::Conflict => stats.conflict_count += 1,
        }
    }
    stats
}
