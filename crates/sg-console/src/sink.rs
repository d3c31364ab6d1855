//! Console sink — filters, highlights, and prints entries.

use async_trait::async_trait;

use sg_core::{LogEntry, Sink, SinkResult};
use sg_match::{FilteringService, HighlightingService};

/// Sink that prints admitted entries to stdout, one line each.
///
/// Suppressed entries are counted at debug level; a highlighter match is
/// rendered as a trailing style tag.
pub struct ConsoleSink {
    filters: FilteringService,
    highlighters: HighlightingService,
}

impl ConsoleSink {
    pub fn new(filters: FilteringService, highlighters: HighlightingService) -> Self {
        Self {
            filters,
            highlighters,
        }
    }
}

#[async_trait]
impl Sink for ConsoleSink {
    async fn add_batch(&self, batch: Vec<LogEntry>) -> SinkResult<()> {
        let total = batch.len();
        let mut shown = 0usize;

        for entry in batch {
            if !self.filters.is_admitted(&entry) {
                continue;
            }
            shown += 1;
            let line = render(&entry, self.highlighters.style_for(&entry));
            println!("{line}");
        }

        if shown < total {
            tracing::debug!(total, shown, "entries suppressed by filters");
        }
        Ok(())
    }
}

fn render(entry: &LogEntry, style: Option<sg_match::Style>) -> String {
    let ts = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
    let mut line = if entry.source.is_empty() {
        format!("{ts} {:5} {}", entry.kind, entry.description)
    } else {
        format!("{ts} {:5} [{}] {}", entry.kind, entry.source, entry.description)
    };
    if let Some(style) = style
        && let Some(fg) = style.foreground
    {
        line.push_str(&format!("  <{fg}>"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use sg_core::MatchField;
    use sg_match::{Matcher, Style};

    #[test]
    fn render_includes_source_and_style_tag() {
        let mut entry = LogEntry::new("ERROR", "boom");
        entry.source = "billing".into();

        let style = Style {
            foreground: Some("red".into()),
            background: None,
        };
        let line = render(&entry, Some(style));
        assert!(line.contains("[billing]"));
        assert!(line.contains("boom"));
        assert!(line.ends_with("<red>"));
    }

    #[tokio::test]
    async fn add_batch_accepts_filtered_batches() {
        let filters = FilteringService::new();
        filters
            .add(Matcher::filter("errors", MatchField::Type, "ERROR").enable())
            .unwrap();
        let sink = ConsoleSink::new(filters, HighlightingService::new());

        // Mixed batch: one admitted, one suppressed. Delivery still succeeds.
        let batch = vec![LogEntry::new("ERROR", "shown"), LogEntry::new("INFO", "hidden")];
        sink.add_batch(batch).await.unwrap();
    }

    #[test]
    fn render_without_style_has_no_tag() {
        let entry = LogEntry::new("INFO", "plain");
        let line = render(&entry, None);
        assert!(!line.contains('<'));
    }
}
