// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sync façade.
//!
//! [`SyncCoordinator`] folds queue statistics, connectivity and the realtime
//! session into one [`SyncSummary`] and exposes the imperative actions a UI
//! or the operator CLI needs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use till_core::{ConnectionState, Mutation, MutationId};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::queue::{OfflineMutationQueue, ProcessReport, Resolution};
use crate::realtime::{RealtimeSession, SessionState};

/// Observable sync state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub is_online: bool,
    pub is_syncing: bool,
    pub queue_size: usize,
    pub failed_count: usize,
    pub conflict_count: usize,
    /// Online and not already syncing.
    pub can_sync: bool,
    pub realtime_connected: bool,
}

pub struct SyncCoordinator {
    queue: Arc<OfflineMutationQueue>,
    network: watch::Receiver<ConnectionState>,
    realtime: Option<watch::Receiver<RealtimeSession>>,
    summary_tx: watch::Sender<SyncSummary>,
    /// Connectivity as last acted on by the watcher.
    seen_online: AtomicBool,
}

impl SyncCoordinator {
    pub fn new(queue: Arc<OfflineMutationQueue>, network: watch::Receiver<ConnectionState>) -> Self {
        let (summary_tx, _) = watch::channel(SyncSummary::default());
        let seen_online = AtomicBool::new(network.borrow().is_online);
        let coordinator = SyncCoordinator {
            queue,
            network,
            realtime: None,
            summary_tx,
            seen_online,
        };
        coordinator.refresh();
        coordinator
    }

    /// Includes the realtime session in the summary.
    pub fn with_realtime(mut self, session: watch::Receiver<RealtimeSession>) -> Self {
        self.realtime = Some(session);
        self.refresh();
        self
    }

    pub fn queue(&self) -> &Arc<OfflineMutationQueue> {
        &self.queue
    }

    pub fn summary(&self) -> SyncSummary {
        self.refresh()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncSummary> {
        self.summary_tx.subscribe()
    }

    /// Queues a write and, when online, delivers it right away.
    ///
    /// A failed delivery leaves the write queued for a later pass. A conflict
    /// is returned as [`Error::Conflict`] with the record kept for
    /// resolution.
    pub async fn submit(&self, mutation: Mutation) -> Result<MutationId> {
        let id = self.queue.enqueue(mutation)?;
        self.refresh();
        if !self.is_online() {
            debug!(id = %id.short(), "offline, write left queued");
            return Ok(id);
        }
        let report = self.queue.deliver_now(id).await;
        self.refresh();
        if report?.conflicts.contains(&id) {
            let server_version = self.queue.get(id).and_then(|m| m.server_version);
            return Err(Error::Conflict { id, server_version });
        }
        Ok(id)
    }

    /// Runs a delivery pass over the queue.
    pub async fn trigger_sync(&self) -> Result<ProcessReport> {
        if !self.is_online() {
            return Err(Error::Offline);
        }
        self.refresh();
        let report = self.queue.process_queue().await;
        self.refresh();
        let report = report?;
        if !report.skipped {
            info!(
                attempted = report.attempted,
                delivered = report.delivered,
                failed = report.failed,
                conflicts = report.conflicts.len(),
                "sync pass finished"
            );
        }
        Ok(report)
    }

    /// Re-attempts failed writes. Conflicts are left for resolution.
    pub async fn retry_failed(&self) -> Result<ProcessReport> {
        if !self.is_online() {
            return Err(Error::Offline);
        }
        self.refresh();
        let report = self.queue.retry_failed().await;
        self.refresh();
        Ok(report?)
    }

    pub fn clear_queue(&self) -> Result<usize> {
        let removed = self.queue.clear_queue();
        self.refresh();
        Ok(removed?)
    }

    pub fn resolve_conflict(&self, id: MutationId, resolution: Resolution) -> Result<()> {
        let result = self.queue.resolve_conflict(id, resolution);
        self.refresh();
        Ok(result?)
    }

    /// Starts the background task that keeps the summary current and syncs
    /// when connectivity returns.
    ///
    /// A change that lands before the task first runs is still seen as a
    /// transition. Cancelling waits for a running sync to finish.
    pub fn spawn(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(Arc::clone(self).watch(cancel))
    }

    async fn watch(self: Arc<Self>, cancel: CancellationToken) {
        let mut network = self.network.clone();
        let mut stats = self.queue.subscribe();
        let mut realtime = self.realtime.clone();
        let mut sync_task: Option<JoinHandle<()>> = None;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = network.changed() => {
                    if changed.is_err() {
                        warn!("network observer dropped, stopping sync coordinator");
                        break;
                    }
                    let online = network.borrow_and_update().is_online;
                    let was_online = self.seen_online.swap(online, Ordering::SeqCst);
                    let idle = sync_task.as_ref().is_none_or(|t| t.is_finished());
                    if online && !was_online && idle {
                        info!("connectivity restored, syncing queued writes");
                        let this = Arc::clone(&self);
                        sync_task = Some(tokio::spawn(async move {
                            if let Err(e) = this.trigger_sync().await {
                                warn!(error = %e, "automatic sync failed");
                            }
                        }));
                    }
                }
                changed = stats.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                Some(changed) = async {
                    match realtime.as_mut() {
                        Some(rx) => Some(rx.changed().await),
                        None => None,
                    }
                } => {
                    if changed.is_err() {
                        realtime = None;
                    }
                }
            }
            self.refresh();
        }
        if let Some(task) = sync_task {
            let _ = task.await;
        }
        debug!("sync coordinator stopped");
    }

    fn is_online(&self) -> bool {
        self.network.borrow().is_online
    }

    /// Recomputes the summary and publishes it if it changed.
    fn refresh(&self) -> SyncSummary {
        let stats = self.queue.stats();
        let is_online = self.is_online();
        let is_syncing = self.queue.is_processing();
        let realtime_connected = self
            .realtime
            .as_ref()
            .is_some_and(|rx| rx.borrow().state == SessionState::Open);
        let summary = SyncSummary {
            is_online,
            is_syncing,
            queue_size: stats.queue_size,
            failed_count: stats.failed_count,
            conflict_count: stats.conflict_count,
            can_sync: is_online && !is_syncing,
            realtime_connected,
        };
        self.summary_tx.send_if_modified(|current| {
            if *current == summary {
                return false;
            }
            *current = summary;
            true
        });
        summary
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
