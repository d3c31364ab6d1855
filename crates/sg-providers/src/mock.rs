//! In-memory log store for testing the database provider without a server.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::database::{LogRow, LogStore};
use crate::error::ProviderResult;

/// [`LogStore`] over a plain vector of rows.
///
/// `push_row` feeds the table mid-test to simulate new log activity; the
/// table name is accepted and ignored.
#[derive(Default)]
pub struct MemoryLogStore {
    rows: Mutex<Vec<LogRow>>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_row(&self, row: LogRow) {
        self.rows.lock().unwrap().push(row);
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl LogStore for MemoryLogStore {
    async fn latest_id(&self, _table: &str) -> ProviderResult<Option<i64>> {
        Ok(self.rows.lock().unwrap().iter().map(|r| r.id).max())
    }

    async fn replay_floor(&self, _table: &str, depth: i64) -> ProviderResult<Option<i64>> {
        let mut ids: Vec<i64> = self.rows.lock().unwrap().iter().map(|r| r.id).collect();
        ids.sort_unstable_by(|a, b| b.cmp(a));
        Ok(ids.into_iter().take(depth as usize).min())
    }

    async fn rows_after(&self, _table: &str, watermark: i64) -> ProviderResult<Vec<LogRow>> {
        let mut rows: Vec<LogRow> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.id > watermark)
            .cloned()
            .collect();
        rows.sort_unstable_by_key(|r| r.id);
        Ok(rows)
    }
}
