//! Pending queue and the periodic flush loop shared by every provider.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;

use sg_core::{LogEntry, Sink};

/// Thread-safe queue decoupling a provider's ingestion loop from delivery.
///
/// The mutex is the only state shared between a provider's two tasks.
/// Ingestion pushes one entry at a time; the flush task drains the whole
/// queue in a single critical section, so a drain never observes a batch
/// mid-refill.
#[derive(Default)]
pub struct PendingQueue {
    inner: Mutex<VecDeque<LogEntry>>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: LogEntry) {
        self.inner.lock().unwrap().push_back(entry);
    }

    /// Atomically take everything, preserving enqueue order.
    pub fn drain(&self) -> Vec<LogEntry> {
        self.inner.lock().unwrap().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }
}

/// Drain the queue once per period and deliver the batch to the sink.
///
/// Runs until cancellation; a cancelled loop performs no further flush, so
/// entries still queued at shutdown are dropped. Empty drains deliver
/// nothing — the sink only ever sees non-empty batches. Sink failures are
/// logged and do not stop the loop.
pub async fn run_flush_loop(
    queue: Arc<PendingQueue>,
    sink: Arc<dyn Sink>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = time::interval(period);
    // Skip the first tick (fires immediately).
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let batch = queue.drain();
                if batch.is_empty() {
                    continue;
                }
                tracing::debug!(count = batch.len(), "delivering batch to sink");
                if let Err(e) = sink.add_batch(batch).await {
                    tracing::warn!(error = %e, "sink failed to accept batch");
                }
            }
        }
    }
}
