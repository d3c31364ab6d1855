//! UDP listener provider — receives JSON event datagrams.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::net::UdpSocket;
use tokio::time;
use tokio_util::sync::CancellationToken;

use sg_core::{LogEntry, Sink};

use crate::batch::{PendingQueue, run_flush_loop};
use crate::error::ProviderResult;
use crate::provider::{LogProvider, ProviderRuntime, ProviderState, spawn_ingestion};
use crate::settings::UdpListenerSettings;

/// Push sources have no natural poll period; batches are pumped out often.
const FLUSH_PERIOD: Duration = Duration::from_millis(100);

/// Receive timeout — the upper bound on how long cancellation can go
/// unobserved while blocked in a receive.
const RECV_TIMEOUT: Duration = Duration::from_secs(1);

/// Back-off before binding a fresh socket after a failure.
const REBIND_DELAY: Duration = Duration::from_secs(1);

/// Listens for UDP datagrams carrying single-property JSON events.
///
/// The receive loop is self-healing: a receive timeout merely re-checks
/// cancellation, and any other socket error abandons the current socket and
/// binds a fresh one. Transient network trouble never ends ingestion.
pub struct UdpListenerProvider {
    settings: UdpListenerSettings,
    runtime: ProviderRuntime,
}

impl UdpListenerProvider {
    pub fn new(settings: UdpListenerSettings) -> Self {
        Self {
            settings,
            runtime: ProviderRuntime::new(),
        }
    }
}

#[async_trait]
impl LogProvider for UdpListenerProvider {
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
        self.runtime.begin_start()?;

        tracing::info!(provider = %self.settings.name, port = self.settings.port, "starting UDP listener");

        let queue = Arc::new(PendingQueue::new());
        let cancel = self.runtime.cancel_token();

        let ingest = spawn_ingestion(
            self.settings.name.clone(),
            listen_loop(self.settings.clone(), queue.clone(), cancel.clone()),
        );
        let flush = tokio::spawn(run_flush_loop(queue, sink, FLUSH_PERIOD, cancel));
        self.runtime.install_tasks(ingest, flush);
        Ok(())
    }

    async fn close(&self) {
        tracing::info!(provider = %self.settings.name, "closing UDP listener");
        self.runtime.close().await;
    }
}

async fn listen_loop(
    settings: UdpListenerSettings,
    queue: Arc<PendingQueue>,
    cancel: CancellationToken,
) -> ProviderResult<()> {
    while !cancel.is_cancelled() {
        let socket = match UdpSocket::bind(("0.0.0.0", settings.port)).await {
            Ok(socket) => socket,
            Err(e) => {
                tracing::error!(port = settings.port, error = %e, "bind failed, retrying");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = time::sleep(REBIND_DELAY) => continue,
                }
            }
        };

        tracing::debug!(port = settings.port, "listening for datagrams");
        receive_until_error(&socket, &queue, &cancel).await;

        if cancel.is_cancelled() {
            break;
        }
        // The socket went bad — drop it and bind a fresh one.
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = time::sleep(REBIND_DELAY) => {}
        }
    }
    Ok(())
}

/// Receive datagrams until cancellation or a socket error.
///
/// Returns normally in both cases; the caller inspects the cancellation
/// token to tell them apart.
async fn receive_until_error(socket: &UdpSocket, queue: &PendingQueue, cancel: &CancellationToken) {
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            received = time::timeout(RECV_TIMEOUT, socket.recv_from(&mut buf)) => {
                match received {
                    // Timeout: loop around and re-check cancellation.
                    Err(_) => continue,
                    Ok(Ok((len, peer))) => {
                        tracing::trace!(bytes = len, peer = %peer, "datagram received");
                        match parse_datagram(&buf[..len]) {
                            Some(entry) => queue.push(entry),
                            None => tracing::debug!(bytes = len, "dropping malformed datagram"),
                        }
                    }
                    Ok(Err(e)) => {
                        tracing::error!(error = %e, "socket error, opening a fresh socket");
                        return;
                    }
                }
            }
        }
    }
}

/// Parse one datagram: a UTF-8 JSON object with exactly one top-level
/// property, named after the source event type, whose value carries the
/// message fields. Anything else is malformed and yields `None`.
fn parse_datagram(payload: &[u8]) -> Option<LogEntry> {
    let text = std::str::from_utf8(payload).ok()?;
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    let object = value.as_object()?;
    if object.len() != 1 {
        return None;
    }

    let (event_type, content) = object.iter().next()?;
    let content = content.as_object()?;
    let description = content.get("Message")?.as_str()?.to_string();

    let mut entry = LogEntry::new(kind_for_event(event_type), description);
    entry.system = event_type.clone();
    entry.timestamp = content
        .get("Timestamp")
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);
    entry.thread = match content.get("ThreadId") {
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(serde_json::Value::String(s)) => s.clone(),
        _ => String::new(),
    };
    entry.source = content
        .get("SenderName")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    entry.metadata.insert(
        "Original".to_string(),
        serde_json::Value::Object(content.clone()),
    );
    Some(entry)
}

/// Fixed event-type → severity table; unknown events are informational.
fn kind_for_event(event_type: &str) -> &'static str {
    match event_type {
        "ErrorRaised" => "ERROR",
        "WarningRaised" => "WARN",
        _ => "INFO",
    }
}
