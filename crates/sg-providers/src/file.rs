//! File tail provider — follows a growing log file by byte offset.

use std::path::Path;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};
use tokio::time;
use tokio_util::sync::CancellationToken;

use sg_core::{LogEntry, Sink};

use crate::batch::{PendingQueue, run_flush_loop};
use crate::error::{ProviderError, ProviderResult};
use crate::provider::{LogProvider, ProviderRuntime, ProviderState, spawn_ingestion};
use crate::settings::FileTailSettings;

// Severity tokens, checked most to least severe.
static KIND_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (
            Regex::new(r"(?i)\b(FATAL|CRITICAL|PANIC)\b").unwrap(),
            "FATAL",
        ),
        (
            Regex::new(r"(?i)\b(ERROR|ERR|FAIL(?:ED|URE)?)\b").unwrap(),
            "ERROR",
        ),
        (Regex::new(r"(?i)\b(WARN(?:ING)?)\b").unwrap(), "WARN"),
        (Regex::new(r"(?i)\b(DEBUG)\b").unwrap(), "DEBUG"),
        (Regex::new(r"(?i)\b(TRACE)\b").unwrap(), "TRACE"),
    ]
});

/// Tails a file, emitting one entry per appended line.
///
/// The watermark is a byte offset. On start the provider seeks to the end of
/// the file — existing content is not replayed — and each tick reads
/// whatever was appended since. A file that shrank (rotation, truncation)
/// is re-tailed from the start; a missing file is retried next tick.
pub struct FileTailProvider {
    settings: FileTailSettings,
    runtime: ProviderRuntime,
}

impl FileTailProvider {
    pub fn new(settings: FileTailSettings) -> Self {
        Self {
            settings,
            runtime: ProviderRuntime::new(),
        }
    }
}

#[async_trait]
impl LogProvider for FileTailProvider {
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
        if self.settings.path.trim().is_empty() {
            return Err(ProviderError::MissingConnectionInfo("file path"));
        }
        self.runtime.begin_start()?;

        tracing::info!(provider = %self.settings.name, path = %self.settings.path, "starting file tail");

        let queue = Arc::new(PendingQueue::new());
        let cancel = self.runtime.cancel_token();

        let ingest = spawn_ingestion(
            self.settings.name.clone(),
            tail_loop(self.settings.clone(), queue.clone(), cancel.clone()),
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
        tracing::info!(provider = %self.settings.name, "closing file tail");
        self.runtime.close().await;
    }
}

async fn tail_loop(
    settings: FileTailSettings,
    queue: Arc<PendingQueue>,
    cancel: CancellationToken,
) -> ProviderResult<()> {
    // Skip whatever the file already holds.
    let mut offset = match fs::metadata(&settings.path).await {
        Ok(meta) => meta.len(),
        Err(_) => 0,
    };
    let mut carry = String::new();

    let mut ticker = time::interval(settings.refresh_interval());
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            _ = ticker.tick() => {}
        }

        match read_appended(&settings.path, &mut offset, &mut carry).await {
            Ok(lines) => {
                for line in lines {
                    queue.push(line_to_entry(&settings.path, line));
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Transient: the file may be mid-rotation.
                tracing::debug!(path = %settings.path, "file not found, retrying next tick");
                offset = 0;
                carry.clear();
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Read bytes appended past `offset`, returning the complete lines found.
///
/// A trailing partial line is held in `carry` until its newline arrives. A
/// file shorter than the offset was truncated or rotated — the offset resets
/// and tailing restarts from byte zero.
async fn read_appended(
    path: &str,
    offset: &mut u64,
    carry: &mut String,
) -> std::io::Result<Vec<String>> {
    let len = fs::metadata(path).await?.len();
    if len < *offset {
        tracing::debug!(path, "file shrank, re-tailing from the start");
        *offset = 0;
        carry.clear();
    }
    if len == *offset {
        return Ok(Vec::new());
    }

    let mut file = fs::File::open(path).await?;
    file.seek(SeekFrom::Start(*offset)).await?;
    let mut buf = Vec::with_capacity((len - *offset) as usize);
    file.take(len - *offset).read_to_end(&mut buf).await?;
    *offset = len;

    carry.push_str(&String::from_utf8_lossy(&buf));
    let mut lines: Vec<String> = Vec::new();
    while let Some(newline) = carry.find('\n') {
        let line: String = carry.drain(..=newline).collect();
        let line = line.trim_end_matches(['\n', '\r']);
        if !line.is_empty() {
            lines.push(line.to_string());
        }
    }
    Ok(lines)
}

fn line_to_entry(path: &str, line: String) -> LogEntry {
    let mut entry = LogEntry::new(detect_kind(&line), line);
    entry.source = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string());
    entry
}

/// Best-effort severity classification from tokens in the line.
fn detect_kind(line: &str) -> &'static str {
    for (pattern, kind) in KIND_PATTERNS.iter() {
        if pattern.is_match(line) {
            return kind;
        }
    }
    "INFO"
}
