//! Recording sink for testing providers without a real consumer.
//!
//! Stores every delivered batch in memory for assertion in tests.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::entry::LogEntry;
use crate::sink::{Sink, SinkResult};

/// Sink that records all batches it receives.
///
/// Thread-safe via `Mutex` (fine for test contexts).
#[derive(Default)]
pub struct RecordingSink {
    batches: Mutex<Vec<Vec<LogEntry>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All delivered batches, in delivery order.
    pub fn batches(&self) -> Vec<Vec<LogEntry>> {
        self.batches.lock().unwrap().clone()
    }

    /// The most recently delivered batch.
    pub fn last_batch(&self) -> Option<Vec<LogEntry>> {
        self.batches.lock().unwrap().last().cloned()
    }

    /// All delivered entries flattened across batches, in delivery order.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.batches.lock().unwrap().iter().flatten().cloned().collect()
    }

    /// Number of delivered batches.
    pub fn batch_count(&self) -> usize {
        self.batches.lock().unwrap().len()
    }

    /// Clear all recorded state.
    pub fn reset(&self) {
        self.batches.lock().unwrap().clear();
    }
}

#[async_trait]
impl Sink for RecordingSink {
    async fn add_batch(&self, batch: Vec<LogEntry>) -> SinkResult<()> {
        self.batches.lock().unwrap().push(batch);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_batches_in_order() {
        let sink = RecordingSink::new();
        sink.add_batch(vec![LogEntry::new("INFO", "one")])
            .await
            .unwrap();
        sink.add_batch(vec![
            LogEntry::new("WARN", "two"),
            LogEntry::new("ERROR", "three"),
        ])
        .await
        .unwrap();

        assert_eq!(sink.batch_count(), 2);
        let entries = sink.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].description, "one");
        assert_eq!(entries[2].description, "three");
        assert_eq!(sink.last_batch().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn reset_clears_state() {
        let sink = RecordingSink::new();
        sink.add_batch(vec![LogEntry::new("INFO", "x")])
            .await
            .unwrap();
        sink.reset();
        assert!(sink.batches().is_empty());
        assert!(sink.last_batch().is_none());
    }
}
