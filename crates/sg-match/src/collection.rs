//! Ordered, name-unique matcher collections with change observation.

use tokio::sync::watch;

use crate::error::{MatchError, MatchResult};
use crate::matcher::Matcher;

/// An ordered set of matchers plus the pinned "search" matcher.
///
/// Insertion order is preserved for display; name uniqueness is enforced at
/// add time across the user matchers and the search slot. The search matcher
/// participates in aggregation like any other member but is not removable —
/// it is the live search box of the owning service.
///
/// Every mutation bumps a revision published through a watch channel, so an
/// owner can subscribe to membership/rule changes instead of polling. There
/// is no caching on the read path: whatever the collection holds at
/// evaluation time is what aggregation sees.
pub struct MatcherCollection {
    matchers: Vec<Matcher>,
    search: Matcher,
    revision: u64,
    revision_tx: watch::Sender<u64>,
}

impl MatcherCollection {
    pub fn new(search: Matcher) -> Self {
        let (revision_tx, _) = watch::channel(0);
        Self {
            matchers: Vec::new(),
            search,
            revision: 0,
            revision_tx,
        }
    }

    /// Append a matcher, rejecting duplicate names.
    pub fn add(&mut self, matcher: Matcher) -> MatchResult<()> {
        let name = matcher.name();
        if name == self.search.name() || self.matchers.iter().any(|m| m.name() == name) {
            return Err(MatchError::DuplicateName(name.to_string()));
        }

        tracing::debug!(matcher = %name, enabled = matcher.enabled(), "matcher added");
        self.matchers.push(matcher);
        self.bump();
        Ok(())
    }

    /// Remove a matcher by name. The search matcher is not removable.
    pub fn remove(&mut self, name: &str) -> MatchResult<Matcher> {
        if name == self.search.name() {
            return Err(MatchError::SearchReserved);
        }
        let index = self
            .matchers
            .iter()
            .position(|m| m.name() == name)
            .ok_or_else(|| MatchError::NotFound(name.to_string()))?;

        let removed = self.matchers.remove(index);
        tracing::debug!(matcher = %name, "matcher removed");
        self.bump();
        Ok(removed)
    }

    /// Mutate a matcher in place (the search matcher included).
    pub fn edit(&mut self, name: &str, f: impl FnOnce(&mut Matcher)) -> MatchResult<()> {
        let matcher = if name == self.search.name() {
            &mut self.search
        } else {
            self.matchers
                .iter_mut()
                .find(|m| m.name() == name)
                .ok_or_else(|| MatchError::NotFound(name.to_string()))?
        };

        f(matcher);
        tracing::debug!(matcher = %name, enabled = matcher.enabled(), "matcher changed");
        self.bump();
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Matcher> {
        if name == self.search.name() {
            return Some(&self.search);
        }
        self.matchers.iter().find(|m| m.name() == name)
    }

    pub fn search(&self) -> &Matcher {
        &self.search
    }

    /// Mutate the search matcher.
    pub fn edit_search(&mut self, f: impl FnOnce(&mut Matcher)) {
        f(&mut self.search);
        self.bump();
    }

    /// User matchers in insertion order, search excluded.
    pub fn iter(&self) -> impl Iterator<Item = &Matcher> {
        self.matchers.iter()
    }

    /// All members that take part in aggregation: user matchers then search.
    pub fn iter_with_search(&self) -> impl Iterator<Item = &Matcher> {
        self.matchers.iter().chain(std::iter::once(&self.search))
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    /// Monotonic change counter.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Subscribe to revision bumps. The receiver is a cancelable handle —
    /// dropping it detaches the observer.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision_tx.subscribe()
    }

    fn bump(&mut self) {
        self.revision += 1;
        // send_replace never fails, even with no live receivers.
        self.revision_tx.send_replace(self.revision);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{MatchMode, MatcherRole};
    use sg_core::MatchField;

    fn collection() -> MatcherCollection {
        MatcherCollection::new(Matcher::filter("Search", MatchField::Description, ""))
    }

    #[test]
    fn add_preserves_insertion_order() {
        let mut c = collection();
        c.add(Matcher::filter("b", MatchField::Type, "B")).unwrap();
        c.add(Matcher::filter("a", MatchField::Type, "A")).unwrap();

        let names: Vec<_> = c.iter().map(|m| m.name().to_string()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn duplicate_name_rejected() {
        let mut c = collection();
        c.add(Matcher::filter("dup", MatchField::Type, "X")).unwrap();
        let err = c.add(Matcher::filter("dup", MatchField::Type, "Y")).unwrap_err();
        assert!(matches!(err, MatchError::DuplicateName(name) if name == "dup"));

        // Search slot name is reserved too.
        let err = c.add(Matcher::filter("Search", MatchField::Type, "Z")).unwrap_err();
        assert!(matches!(err, MatchError::DuplicateName(_)));
    }

    #[test]
    fn search_matcher_not_removable() {
        let mut c = collection();
        assert!(matches!(c.remove("Search"), Err(MatchError::SearchReserved)));
    }

    #[test]
    fn remove_unknown_reports_not_found() {
        let mut c = collection();
        assert!(matches!(c.remove("ghost"), Err(MatchError::NotFound(_))));
    }

    #[test]
    fn edit_reaches_user_and_search_matchers() {
        let mut c = collection();
        c.add(Matcher::extractor("e", MatchField::Type, MatchMode::Exact, "X"))
            .unwrap();

        c.edit("e", |m| m.set_enabled(true)).unwrap();
        assert!(c.get("e").unwrap().enabled());
        assert_eq!(c.get("e").unwrap().role(), MatcherRole::Extractor);

        c.edit("Search", |m| m.set_pattern("needle")).unwrap();
        assert_eq!(c.search().pattern(), "needle");
    }

    #[test]
    fn mutations_bump_revision_and_notify() {
        let mut c = collection();
        let rx = c.subscribe();
        assert_eq!(*rx.borrow(), 0);

        c.add(Matcher::filter("f", MatchField::Type, "F")).unwrap();
        c.edit("f", |m| m.set_enabled(true)).unwrap();
        c.remove("f").unwrap();

        assert_eq!(c.revision(), 3);
        assert_eq!(*rx.borrow(), 3);
    }

    #[test]
    fn iter_with_search_appends_search_slot() {
        let mut c = collection();
        c.add(Matcher::filter("f", MatchField::Type, "F")).unwrap();
        let names: Vec<_> = c.iter_with_search().map(|m| m.name().to_string()).collect();
        assert_eq!(names, vec!["f", "Search"]);
    }
}
