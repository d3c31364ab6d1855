//! The provider contract and the shared lifecycle runtime.

use std::future::Future;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use sg_core::Sink;

use crate::error::{ProviderError, ProviderResult};

/// Lifecycle state of a provider.
///
/// `Created → Running → Closed`; Closed is terminal. There is no Paused
/// state — `pause()` stops the provider, and a stopped provider must be
/// rebuilt to run again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderState {
    Created,
    Running,
    Closed,
}

/// A source-specific component that produces log entries.
///
/// The set of implementers is closed: file tail, database poll, UDP
/// listener. Each owns two tokio tasks once started — ingestion and flush —
/// sharing nothing but the pending queue.
#[async_trait]
pub trait LogProvider: Send + Sync {
    /// Display name of this provider instance.
    fn name(&self) -> &str;

    /// Human-readable description of what is being monitored.
    fn summary(&self) -> String;

    fn state(&self) -> ProviderState;

    /// True iff the ingestion task exists and has not completed.
    fn is_active(&self) -> bool;

    /// Spawn the ingestion and flush tasks, delivering batches to `sink`.
    ///
    /// Fails fast — before anything is spawned — when required connection
    /// info is blank, when the provider is already running, or when it has
    /// been closed.
    fn start(&self, sink: Arc<dyn Sink>) -> ProviderResult<()>;

    /// Signal cooperative cancellation to both tasks and wait for them to
    /// wind down (best-effort join). Idempotent — closing an already-closed
    /// provider is a no-op.
    async fn close(&self);

    /// Alias for [`close`](LogProvider::close). There is no
    /// suspend-and-resume; a paused provider must be rebuilt.
    async fn pause(&self) {
        self.close().await;
    }
}

/// Shared lifecycle state for the concrete providers: the state machine,
/// the per-provider cancellation token, and the two task handles.
pub(crate) struct ProviderRuntime {
    state: Mutex<ProviderState>,
    cancel: CancellationToken,
    tasks: Mutex<Option<(JoinHandle<()>, JoinHandle<()>)>>,
}

impl ProviderRuntime {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(ProviderState::Created),
            cancel: CancellationToken::new(),
            tasks: Mutex::new(None),
        }
    }

    pub(crate) fn state(&self) -> ProviderState {
        *self.state.lock().unwrap()
    }

    /// Transition Created → Running, rejecting anything else.
    pub(crate) fn begin_start(&self) -> ProviderResult<()> {
        let mut state = self.state.lock().unwrap();
        match *state {
            ProviderState::Created => {
                *state = ProviderState::Running;
                Ok(())
            }
            ProviderState::Running => Err(ProviderError::AlreadyRunning),
            ProviderState::Closed => Err(ProviderError::Closed),
        }
    }

    pub(crate) fn install_tasks(&self, ingest: JoinHandle<()>, flush: JoinHandle<()>) {
        *self.tasks.lock().unwrap() = Some((ingest, flush));
    }

    pub(crate) fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub(crate) fn is_active(&self) -> bool {
        self.tasks
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|(ingest, _)| !ingest.is_finished())
    }

    pub(crate) async fn close(&self) {
        *self.state.lock().unwrap() = ProviderState::Closed;
        self.cancel.cancel();

        let tasks = self.tasks.lock().unwrap().take();
        if let Some((ingest, flush)) = tasks {
            let _ = ingest.await;
            let _ = flush.await;
        }
    }
}

/// Spawn an ingestion loop, catching failures at the task boundary.
///
/// An unexpected error ends ingestion for this provider only; it is logged
/// for the operator and `is_active` turns false.
pub(crate) fn spawn_ingestion<F>(name: String, task: F) -> JoinHandle<()>
where
    F: Future<Output = ProviderResult<()>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = task.await {
            tracing::error!(provider = %name, error = %e, "ingestion task failed");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn begin_start_enforces_the_state_machine() {
        let runtime = ProviderRuntime::new();
        assert_eq!(runtime.state(), ProviderState::Created);

        runtime.begin_start().unwrap();
        assert_eq!(runtime.state(), ProviderState::Running);
        assert!(matches!(
            runtime.begin_start(),
            Err(ProviderError::AlreadyRunning)
        ));

        runtime.close().await;
        assert_eq!(runtime.state(), ProviderState::Closed);
        assert!(matches!(runtime.begin_start(), Err(ProviderError::Closed)));
    }

    #[tokio::test]
    async fn close_joins_tasks_and_is_idempotent() {
        let runtime = ProviderRuntime::new();
        runtime.begin_start().unwrap();

        let cancel = runtime.cancel_token();
        let ingest = tokio::spawn({
            let cancel = cancel.clone();
            async move { cancel.cancelled().await }
        });
        let flush = tokio::spawn(async move { cancel.cancelled().await });
        runtime.install_tasks(ingest, flush);
        assert!(runtime.is_active());

        runtime.close().await;
        assert!(!runtime.is_active());

        // Second close is a no-op.
        runtime.close().await;
        assert_eq!(runtime.state(), ProviderState::Closed);
    }

    #[tokio::test]
    async fn failed_ingestion_turns_inactive() {
        let runtime = ProviderRuntime::new();
        runtime.begin_start().unwrap();

        let ingest = spawn_ingestion("broken".into(), async {
            Err(ProviderError::MissingConnectionInfo("path"))
        });
        let flush = tokio::spawn(async {});
        runtime.install_tasks(ingest, flush);

        // Give the failed task a chance to finish.
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!runtime.is_active());
    }
}
