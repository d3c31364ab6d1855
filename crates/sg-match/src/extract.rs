//! Extraction — OR aggregation for derived/search views.

use std::sync::RwLock;

use tokio::sync::watch;

use sg_core::{LogEntry, MatchField};

use crate::collection::MatcherCollection;
use crate::error::MatchResult;
use crate::matcher::{MatchMode, Matcher, MatcherRole};

/// Decides which entries are surfaced by a derived/search view.
///
/// Same OR-over-enabled-matchers policy as admission, with the opposite
/// resting state: an empty or fully disabled set surfaces nothing. A view
/// that extracts everything would be the main view again.
pub struct ExtractingService {
    inner: RwLock<MatcherCollection>,
}

impl ExtractingService {
    pub fn new() -> Self {
        let search = Matcher::extractor(
            "Search",
            MatchField::Description,
            MatchMode::CaseInsensitive,
            "",
        );
        Self {
            inner: RwLock::new(MatcherCollection::new(search)),
        }
    }

    /// True iff any enabled extractor matches the entry.
    pub fn is_extracted(&self, entry: &LogEntry) -> bool {
        self.inner
            .read()
            .unwrap()
            .iter_with_search()
            .any(|m| m.enabled() && m.is_match(entry))
    }

    pub fn add(&self, matcher: Matcher) -> MatchResult<()> {
        debug_assert_eq!(matcher.role(), MatcherRole::Extractor);
        self.inner.write().unwrap().add(matcher)
    }

    pub fn remove(&self, name: &str) -> MatchResult<Matcher> {
        self.inner.write().unwrap().remove(name)
    }

    pub fn edit(&self, name: &str, f: impl FnOnce(&mut Matcher)) -> MatchResult<()> {
        self.inner.write().unwrap().edit(name, f)
    }

    /// Update the live search extractor.
    pub fn edit_search(&self, f: impl FnOnce(&mut Matcher)) {
        self.inner.write().unwrap().edit_search(f);
    }

    /// Observe membership/rule changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.read().unwrap().subscribe()
    }
}

impl Default for ExtractingService {
    fn default() -> Self {
        Self::new()
    }
}
