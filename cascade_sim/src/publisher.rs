//! Periodic snapshot publishing.
//!
//! Every cycle serializes the whole graph into a [`PushMessage`] and hands
//! the bytes to whatever sink is currently bound. Failures are logged and
//! counted; the next cycle goes ahead regardless.

use cascade_core::{GraphStore, PushMessage};
use cascade_env::{CascadeContext, SnapshotSink};
use chrono::{DateTime, Local};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Holds the one sink bound at a time.
#[derive(Default)]
pub struct SinkSlot {
    current: RwLock<Option<Arc<dyn SnapshotSink>>>,
}

impl SinkSlot {
    /// Binds a sink, returning the one it replaces.
    pub fn bind(&self, sink: Arc<dyn SnapshotSink>) -> Option<Arc<dyn SnapshotSink>> {
        self.current.write().replace(sink)
    }

    /// Unbinds the current sink.
    pub fn unbind(&self) -> Option<Arc<dyn SnapshotSink>> {
        self.current.write().take()
    }

    pub fn current(&self) -> Option<Arc<dyn SnapshotSink>> {
        self.current.read().clone()
    }
}

/// Delivery counters, cumulative over the controller's lifetime.
#[derive(Debug, Default)]
pub struct PublisherStats {
    published: AtomicU64,
    failed: AtomicU64,
}

/// Plain copy of [`PublisherStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PublishCounts {
    pub published: u64,
    pub failed: u64,
}

impl PublisherStats {
    pub fn counts(&self) -> PublishCounts {
        PublishCounts {
            published: self.published.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Result of one publish cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Delivered,
    Failed,
    NoSink,
}

/// Formats the snapshot annotation, e.g. `Data in 2024-01-01 12:00:00.250`.
pub fn format_appendix(time: SystemTime) -> String {
    let local: DateTime<Local> = time.into();
    format!("Data in {}", local.format("%Y-%m-%d %H:%M:%S%.3f"))
}

/// Samples the graph on a fixed period and pushes full snapshots.
pub struct SnapshotPublisher<Ctx: CascadeContext> {
    ctx: Arc<Ctx>,
    store: Arc<GraphStore>,
    sinks: Arc<SinkSlot>,
    stats: Arc<PublisherStats>,
    interval: Duration,
}

impl<Ctx: CascadeContext> SnapshotPublisher<Ctx> {
    pub fn new(
        ctx: Arc<Ctx>,
        store: Arc<GraphStore>,
        sinks: Arc<SinkSlot>,
        stats: Arc<PublisherStats>,
        interval: Duration,
    ) -> Self {
        Self {
            ctx,
            store,
            sinks,
            stats,
            interval,
        }
    }

    /// Builds, encodes and delivers one snapshot.
    pub async fn publish_once(&self) -> PublishOutcome {
        let Some(sink) = self.sinks.current() else {
            debug!("No sink bound, skipping snapshot");
            return PublishOutcome::NoSink;
        };

        let message: PushMessage = self.store.push_message(format_appendix(self.ctx.system_time()));
        let payload = match message.to_json_bytes() {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Failed to encode snapshot: {}", e);
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                return PublishOutcome::Failed;
            }
        };

        match sink.publish(payload).await {
            Ok(()) => {
                self.stats.published.fetch_add(1, Ordering::Relaxed);
                PublishOutcome::Delivered
            }
            Err(e) => {
                warn!("Snapshot delivery to {} failed: {}", sink.describe(), e);
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                PublishOutcome::Failed
            }
        }
    }

    /// Publishes until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        loop {
            // A stalled sink must not outlive the run
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.publish_once() => {}
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.ctx.sleep(self.interval) => {}
            }
        }
        debug!("Snapshot publisher stopped");
    }
}
