//! Highlighting — first-match style lookup, not a boolean aggregate.

use std::sync::RwLock;

use tokio::sync::watch;

use sg_core::{LogEntry, MatchField};

use crate::collection::MatcherCollection;
use crate::error::MatchResult;
use crate::matcher::{MatchMode, Matcher, MatcherRole, Style};

/// Resolves the presentation style for an entry.
///
/// The search highlighter is consulted first (it is the interactive one),
/// then the user highlighters in collection order; the first enabled matcher
/// that fires supplies its style. No match leaves the entry unstyled.
pub struct HighlightingService {
    inner: RwLock<MatcherCollection>,
}

impl HighlightingService {
    pub fn new() -> Self {
        let search = Matcher::highlighter(
            "Search",
            MatchField::Description,
            MatchMode::CaseInsensitive,
            "",
            Style::default(),
        );
        Self {
            inner: RwLock::new(MatcherCollection::new(search)),
        }
    }

    /// Style for the first enabled highlighter matching the entry.
    pub fn style_for(&self, entry: &LogEntry) -> Option<Style> {
        let inner = self.inner.read().unwrap();
        std::iter::once(inner.search())
            .chain(inner.iter())
            .find(|m| m.enabled() && m.is_match(entry))
            .and_then(|m| m.style().cloned())
    }

    pub fn add(&self, matcher: Matcher) -> MatchResult<()> {
        debug_assert_eq!(matcher.role(), MatcherRole::Highlighter);
        self.inner.write().unwrap().add(matcher)
    }

    pub fn remove(&self, name: &str) -> MatchResult<Matcher> {
        self.inner.write().unwrap().remove(name)
    }

    pub fn edit(&self, name: &str, f: impl FnOnce(&mut Matcher)) -> MatchResult<()> {
        self.inner.write().unwrap().edit(name, f)
    }

    /// Update the live search highlighter.
    pub fn edit_search(&self, f: impl FnOnce(&mut Matcher)) {
        self.inner.write().unwrap().edit_search(f);
    }

    /// Observe membership/rule changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.read().unwrap().subscribe()
    }
}

impl Default for HighlightingService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(kind: &str, description: &str) -> LogEntry {
        LogEntry::new(kind, description)
    }

    fn red() -> Style {
        Style {
            foreground: Some("red".into()),
            background: None,
        }
    }

    fn yellow() -> Style {
        Style {
            foreground: Some("yellow".into()),
            background: None,
        }
    }

    #[test]
    fn no_match_leaves_entry_unstyled() {
        let service = HighlightingService::new();
        assert!(service.style_for(&entry("ERROR", "boom")).is_none());
    }

    #[test]
    fn first_enabled_match_wins() {
        let service = HighlightingService::new();
        service
            .add(
                Matcher::highlighter("errors", MatchField::Type, MatchMode::Exact, "ERROR", red())
                    .enable(),
            )
            .unwrap();
        service
            .add(
                Matcher::highlighter(
                    "noisy",
                    MatchField::Description,
                    MatchMode::CaseInsensitive,
                    "boom",
                    yellow(),
                )
                .enable(),
            )
            .unwrap();

        // Both match; collection order decides.
        let style = service.style_for(&entry("ERROR", "boom")).unwrap();
        assert_eq!(style.foreground.as_deref(), Some("red"));
    }

    #[test]
    fn disabled_highlighter_is_skipped() {
        let service = HighlightingService::new();
        service
            .add(Matcher::highlighter(
                "errors",
                MatchField::Type,
                MatchMode::Exact,
                "ERROR",
                red(),
            ))
            .unwrap();

        assert!(service.style_for(&entry("ERROR", "boom")).is_none());
    }

    #[test]
    fn empty_pattern_highlighter_styles_nothing() {
        let service = HighlightingService::new();
        service
            .add(
                Matcher::highlighter("blank", MatchField::Type, MatchMode::Contains, "", red())
                    .enable(),
            )
            .unwrap();

        assert!(service.style_for(&entry("ERROR", "boom")).is_none());
    }

    #[test]
    fn search_highlighter_takes_precedence() {
        let service = HighlightingService::new();
        service
            .add(
                Matcher::highlighter("errors", MatchField::Type, MatchMode::Exact, "ERROR", red())
                    .enable(),
            )
            .unwrap();
        service.edit_search(|m| {
            m.set_pattern("boom");
            m.set_style(Some(yellow()));
            m.set_enabled(true);
        });

        let style = service.style_for(&entry("ERROR", "boom")).unwrap();
        assert_eq!(style.foreground.as_deref(), Some("yellow"));
    }
}
