//! The sink contract — where providers deliver their batches.

use async_trait::async_trait;
use thiserror::Error;

use crate::entry::LogEntry;

/// Errors a sink may report back to the flush task.
///
/// Delivery failures are the sink's concern: the flush task logs them and
/// carries on, they never destabilize the provider.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink rejected batch: {0}")]
    Rejected(String),

    #[error("{0}")]
    Other(String),
}

/// Convenience alias for sink results.
pub type SinkResult<T> = Result<T, SinkError>;

/// Consumer of ingested log entries.
///
/// Implemented by whatever renders or stores entries downstream; the engine
/// only requires that `add_batch` is safe to call from a provider's flush
/// task. Batches are non-empty and ordered — the flush loop never delivers
/// an empty batch, and entries arrive in the order they were enqueued.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Accept one ordered batch of entries.
    async fn add_batch(&self, batch: Vec<LogEntry>) -> SinkResult<()>;
}
