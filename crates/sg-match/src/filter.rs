//! Admission filtering — the fail-open OR aggregate.

use std::sync::RwLock;

use tokio::sync::watch;

use sg_core::{LogEntry, MatchField};

use crate::collection::MatcherCollection;
use crate::error::MatchResult;
use crate::matcher::{Matcher, MatcherRole};

/// Decides which entries are admitted to the main view.
///
/// Holds an ordered collection of filter-role matchers plus the pinned
/// search filter. Admission is an allow-list OR, not a chain of exclusions:
/// with no enabled filters every entry passes (fail-open); otherwise an
/// entry passes iff **any** enabled filter matches it.
///
/// Mutations and match evaluation may come from different tasks; the
/// interior lock makes every mutation visible to the next evaluation.
pub struct FilteringService {
    inner: RwLock<MatcherCollection>,
}

impl FilteringService {
    pub fn new() -> Self {
        let search = Matcher::filter("Search", MatchField::Description, "");
        Self {
            inner: RwLock::new(MatcherCollection::new(search)),
        }
    }

    /// Service seeded with the conventional per-level filters, all disabled.
    pub fn with_standard_filters() -> Self {
        let service = Self::new();
        {
            let mut inner = service.inner.write().unwrap();
            for (name, pattern) in [
                ("Trace", "TRACE"),
                ("Debug", "DEBUG"),
                ("Info", "INFO"),
                ("Warn", "WARN"),
                ("Error", "ERROR"),
                ("Fatal", "FATAL"),
            ] {
                inner
                    .add(Matcher::filter(name, MatchField::Type, pattern))
                    .expect("standard filter names are distinct");
            }
        }
        service
    }

    /// True iff the entry passes the current filter set.
    pub fn is_admitted(&self, entry: &LogEntry) -> bool {
        let inner = self.inner.read().unwrap();
        let mut active = inner.iter_with_search().filter(|m| m.enabled()).peekable();
        if active.peek().is_none() {
            return true;
        }
        active.any(|m| m.is_match(entry))
    }

    pub fn add(&self, matcher: Matcher) -> MatchResult<()> {
        debug_assert_eq!(matcher.role(), MatcherRole::Filter);
        self.inner.write().unwrap().add(matcher)
    }

    pub fn remove(&self, name: &str) -> MatchResult<Matcher> {
        self.inner.write().unwrap().remove(name)
    }

    pub fn edit(&self, name: &str, f: impl FnOnce(&mut Matcher)) -> MatchResult<()> {
        self.inner.write().unwrap().edit(name, f)
    }

    pub fn set_enabled(&self, name: &str, enabled: bool) -> MatchResult<()> {
        self.edit(name, |m| m.set_enabled(enabled))
    }

    /// Update the live search filter (pattern, mode, enabled state).
    pub fn edit_search(&self, f: impl FnOnce(&mut Matcher)) {
        self.inner.write().unwrap().edit_search(f);
    }

    pub fn filter_names(&self) -> Vec<String> {
        self.inner
            .read()
            .unwrap()
            .iter()
            .map(|m| m.name().to_string())
            .collect()
    }

    /// Observe membership/rule changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.read().unwrap().subscribe()
    }
}

impl Default for FilteringService {
    fn default() -> Self {
        Self::new()
    }
}
