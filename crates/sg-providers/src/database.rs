//! Database poll provider — watermark-tailed reads of a log table.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::Row;
use tokio::time;
use tokio_util::sync::CancellationToken;

use sg_core::{LogEntry, Sink};

use crate::batch::{PendingQueue, run_flush_loop};
use crate::error::{ProviderError, ProviderResult};
use crate::provider::{LogProvider, ProviderRuntime, ProviderState, spawn_ingestion};
use crate::settings::DbPollSettings;

/// How many of the newest rows to replay when `load_existing_content` is set.
const REPLAY_DEPTH: i64 = 1000;

/// One row of the monitored log table.
///
/// Wire contract: `id` is a monotonically increasing integer; `exception`
/// is optional and becomes metadata when non-empty.
#[derive(Debug, Clone)]
pub struct LogRow {
    pub id: i64,
    pub date: DateTime<Utc>,
    pub logger: String,
    pub level: String,
    pub message: String,
    pub exception: Option<String>,
}

/// Read access to the monitored table.
///
/// Abstracted so watermark semantics are testable without a database server;
/// production uses [`PgLogStore`], tests use the in-memory mock.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Highest id currently in the table, `None` when empty.
    async fn latest_id(&self, table: &str) -> ProviderResult<Option<i64>>;

    /// Smallest id among the newest `depth` rows, `None` when empty.
    async fn replay_floor(&self, table: &str, depth: i64) -> ProviderResult<Option<i64>>;

    /// All rows with id greater than `watermark`, ordered by id.
    async fn rows_after(&self, table: &str, watermark: i64) -> ProviderResult<Vec<LogRow>>;
}

/// Postgres-backed [`LogStore`].
pub struct PgLogStore {
    pool: PgPool,
}

impl PgLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(connection_string: &str) -> ProviderResult<Self> {
        let pool = PgPool::connect(connection_string).await?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl LogStore for PgLogStore {
    async fn latest_id(&self, table: &str) -> ProviderResult<Option<i64>> {
        let id = sqlx::query_scalar::<_, Option<i64>>(&format!("select max(id) from {table}"))
            .fetch_one(&self.pool)
            .await?;
        Ok(id)
    }

    async fn replay_floor(&self, table: &str, depth: i64) -> ProviderResult<Option<i64>> {
        let id = sqlx::query_scalar::<_, Option<i64>>(&format!(
            "select min(t.id) from (select id from {table} order by id desc limit {depth}) t"
        ))
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn rows_after(&self, table: &str, watermark: i64) -> ProviderResult<Vec<LogRow>> {
        let rows = sqlx::query(&format!(
            "select * from {table} where id > $1 order by id"
        ))
        .bind(watermark)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(LogRow {
                id: row.try_get("id")?,
                date: row.try_get("date")?,
                logger: row.try_get("logger")?,
                level: row.try_get("level")?,
                message: row.try_get("message")?,
                exception: row.try_get("exception")?,
            });
        }
        Ok(out)
    }
}

/// Polls a database table for rows beyond a monotonically advancing
/// watermark and maps each row to a log entry.
pub struct DbPollProvider {
    settings: DbPollSettings,
    store: Option<Arc<dyn LogStore>>,
    runtime: ProviderRuntime,
}

impl DbPollProvider {
    /// Provider that connects with the settings' connection string on start.
    pub fn new(settings: DbPollSettings) -> Self {
        Self {
            settings,
            store: None,
            runtime: ProviderRuntime::new(),
        }
    }

    /// Provider over an explicit store — used by tests and by callers that
    /// manage their own pool.
    pub fn with_store(settings: DbPollSettings, store: Arc<dyn LogStore>) -> Self {
        Self {
            settings,
            store: Some(store),
            runtime: ProviderRuntime::new(),
        }
    }
}

#[async_trait]
impl LogProvider for DbPollProvider {
    fn name(&self) -> &str {
        &self.settings.name
    }

    fn summary(&self) -> String {
        self.settings.summary()
    }

    fn state(&self) -> ProviderState {
        self.runtime.state()
    }

    fn is_active(&self) -> bool {
        self.runtime.is_active()
    }

    fn start(&self, sink: Arc<dyn Sink>) -> ProviderResult<()> {
        if self.store.is_none() && self.settings.connection_string.trim().is_empty() {
            return Err(ProviderError::MissingConnectionInfo("connection string"));
        }
        if self.settings.table.trim().is_empty() {
            return Err(ProviderError::MissingConnectionInfo("table name"));
        }
        self.runtime.begin_start()?;

        tracing::info!(
            provider = %self.settings.name,
            table = %self.settings.table,
            load_existing = self.settings.load_existing_content,
            "starting db poll"
        );

        let queue = Arc::new(PendingQueue::new());
        let cancel = self.runtime.cancel_token();

        let ingest = spawn_ingestion(
            self.settings.name.clone(),
            poll_loop(
                self.settings.clone(),
                self.store.clone(),
                queue.clone(),
                cancel.clone(),
            ),
        );
        let flush = tokio::spawn(run_flush_loop(
            queue,
            sink,
            self.settings.refresh_interval(),
            cancel,
        ));
        self.runtime.install_tasks(ingest, flush);
        Ok(())
    }

    async fn close(&self) {
        tracing::info!(provider = %self.settings.name, "closing db poll");
        self.runtime.close().await;
    }
}

async fn poll_loop(
    settings: DbPollSettings,
    store: Option<Arc<dyn LogStore>>,
    queue: Arc<PendingQueue>,
    cancel: CancellationToken,
) -> ProviderResult<()> {
    let store = match store {
        Some(store) => store,
        None => Arc::new(PgLogStore::connect(&settings.connection_string).await?),
    };

    let mut watermark = establish_watermark(store.as_ref(), &settings).await?;
    tracing::debug!(provider = %settings.name, watermark, "initial watermark established");

    // First read right away, then once per period.
    watermark = poll_once(store.as_ref(), &settings.table, watermark, &queue).await?;

    let mut ticker = time::interval(settings.refresh_interval());
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            _ = ticker.tick() => {}
        }

        // A failed round-trip leaves the watermark untouched: nothing was
        // enqueued, so the same rows are picked up next tick.
        match poll_once(store.as_ref(), &settings.table, watermark, &queue).await {
            Ok(advanced) => watermark = advanced,
            Err(e) => {
                tracing::warn!(provider = %settings.name, error = %e, "poll failed, retrying next tick");
            }
        }
    }
}

/// Establish the low watermark at start-up.
///
/// Skipping history tails from the current maximum id. Replaying history
/// places the watermark [`REPLAY_DEPTH`] rows back from the latest, so the
/// first poll delivers exactly the newest `REPLAY_DEPTH` rows.
async fn establish_watermark(
    store: &dyn LogStore,
    settings: &DbPollSettings,
) -> ProviderResult<i64> {
    if !settings.load_existing_content {
        return Ok(store.latest_id(&settings.table).await?.unwrap_or(0));
    }
    let floor = store.replay_floor(&settings.table, REPLAY_DEPTH).await?;
    Ok(floor.map(|id| id - 1).unwrap_or(0))
}

/// One poll: read rows past the watermark in id order, enqueue them, and
/// return the advanced watermark (never smaller than before).
async fn poll_once(
    store: &dyn LogStore,
    table: &str,
    watermark: i64,
    queue: &PendingQueue,
) -> ProviderResult<i64> {
    let rows = store.rows_after(table, watermark).await?;
    if rows.is_empty() {
        return Ok(watermark);
    }

    tracing::debug!(count = rows.len(), "rows read past watermark");
    let mut advanced = watermark;
    for row in rows {
        advanced = advanced.max(row.id);
        queue.push(row_to_entry(row));
    }
    Ok(advanced)
}

fn row_to_entry(row: LogRow) -> LogEntry {
    let mut entry = LogEntry::new(row.level, row.message);
    entry.timestamp = row.date;
    entry.source = row.logger;
    if let Some(exception) = row.exception
        && !exception.trim().is_empty()
    {
        entry
            .metadata
            .insert("Exception".to_string(), serde_json::Value::String(exception));
    }
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MemoryLogStore;
    use sg_core::RecordingSink;

    fn settings(load_existing: bool) -> DbPollSettings {
        DbPollSettings {
            name: "audit".into(),
            connection_string: "postgres://localhost/logs".into(),
            table: "log".into(),
            refresh_secs: 1,
            load_existing_content: load_existing,
        }
    }

    fn store_with_rows(count: i64) -> MemoryLogStore {
        let store = MemoryLogStore::new();
        for id in 1..=count {
            store.push_row(LogRow {
                id,
                date: Utc::now(),
                logger: "app".into(),
                level: "INFO".into(),
                message: format!("row {id}"),
                exception: None,
            });
        }
        store
    }

    #[tokio::test]
    async fn skip_history_watermark_is_latest_id() {
        let store = store_with_rows(2000);
        let watermark = establish_watermark(&store, &settings(false)).await.unwrap();
        assert_eq!(watermark, 2000);

        // Nothing to deliver, and repeated polls stay silent.
        let queue = PendingQueue::new();
        let watermark = poll_once(&store, "log", watermark, &queue).await.unwrap();
        assert_eq!(watermark, 2000);
        let watermark = poll_once(&store, "log", watermark, &queue).await.unwrap();
        assert_eq!(watermark, 2000);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn replay_watermark_is_one_thousand_rows_back() {
        let store = store_with_rows(2000);
        let watermark = establish_watermark(&store, &settings(true)).await.unwrap();
        assert_eq!(watermark, 1000);

        let queue = PendingQueue::new();
        let watermark = poll_once(&store, "log", watermark, &queue).await.unwrap();
        assert_eq!(watermark, 2000);

        let delivered = queue.drain();
        assert_eq!(delivered.len(), 1000);
        assert_eq!(delivered.first().unwrap().description, "row 1001");
        assert_eq!(delivered.last().unwrap().description, "row 2000");
    }

    #[tokio::test]
    async fn short_table_replays_everything() {
        let store = store_with_rows(200);
        let watermark = establish_watermark(&store, &settings(true)).await.unwrap();
        assert_eq!(watermark, 0);

        let queue = PendingQueue::new();
        let watermark = poll_once(&store, "log", watermark, &queue).await.unwrap();
        assert_eq!(watermark, 200);
        assert_eq!(queue.len(), 200);
    }

    #[tokio::test]
    async fn empty_table_starts_at_zero() {
        let store = MemoryLogStore::new();
        assert_eq!(
            establish_watermark(&store, &settings(false)).await.unwrap(),
            0
        );
        assert_eq!(
            establish_watermark(&store, &settings(true)).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn rows_are_never_reprocessed() {
        let store = store_with_rows(10);
        let queue = PendingQueue::new();

        let mut watermark = establish_watermark(&store, &settings(false)).await.unwrap();
        assert_eq!(watermark, 10);

        store.push_row(LogRow {
            id: 11,
            date: Utc::now(),
            logger: "app".into(),
            level: "ERROR".into(),
            message: "row 11".into(),
            exception: None,
        });

        watermark = poll_once(&store, "log", watermark, &queue).await.unwrap();
        assert_eq!(watermark, 11);
        assert_eq!(queue.drain().len(), 1);

        // Same rows again: nothing new.
        watermark = poll_once(&store, "log", watermark, &queue).await.unwrap();
        assert_eq!(watermark, 11);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn row_mapping_carries_the_exception() {
        let row = LogRow {
            id: 1,
            date: Utc::now(),
            logger: "billing".into(),
            level: "ERROR".into(),
            message: "charge failed".into(),
            exception: Some("NullReferenceException at ...".into()),
        };
        let entry = row_to_entry(row);
        assert_eq!(entry.kind, "ERROR");
        assert_eq!(entry.source, "billing");
        assert_eq!(entry.description, "charge failed");
        assert_eq!(
            entry.metadata.get("Exception").and_then(|v| v.as_str()),
            Some("NullReferenceException at ...")
        );

        // Blank exception text is not metadata.
        let row = LogRow {
            id: 2,
            date: Utc::now(),
            logger: "billing".into(),
            level: "INFO".into(),
            message: "ok".into(),
            exception: Some("   ".into()),
        };
        assert!(row_to_entry(row).metadata.is_empty());
    }

    #[tokio::test]
    async fn start_preconditions_fail_fast() {
        let sink = Arc::new(RecordingSink::new());

        let mut bad = settings(false);
        bad.connection_string = String::new();
        let provider = DbPollProvider::new(bad);
        assert!(matches!(
            provider.start(sink.clone()),
            Err(ProviderError::MissingConnectionInfo("connection string"))
        ));

        let mut bad = settings(false);
        bad.table = String::new();
        let provider = DbPollProvider::new(bad);
        assert!(matches!(
            provider.start(sink),
            Err(ProviderError::MissingConnectionInfo("table name"))
        ));
    }

    #[tokio::test]
    async fn lifecycle_with_mock_store() {
        let store = Arc::new(store_with_rows(5));
        let provider = DbPollProvider::with_store(settings(false), store);
        let sink = Arc::new(RecordingSink::new());

        provider.start(sink).unwrap();
        assert!(provider.is_active());

        provider.close().await;
        assert!(!provider.is_active());
        assert_eq!(provider.state(), ProviderState::Closed);
    }
}
