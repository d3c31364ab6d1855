//! Spyglass matching engine.
//!
//! One rule type, three roles: a [`Matcher`] tests a single field of a log
//! entry against a pattern, and the aggregation services combine matchers
//! into the three decisions downstream consumers need —
//! admission ([`FilteringService`]), styling ([`HighlightingService`]) and
//! derived-view inclusion ([`ExtractingService`]).

pub mod collection;
pub mod error;
pub mod extract;
pub mod filter;
pub mod highlight;
pub mod matcher;

// Re-exports for convenience.
pub use collection::MatcherCollection;
pub use error::{MatchError, MatchResult};
pub use extract::ExtractingService;
pub use filter::FilteringService;
pub use highlight::HighlightingService;
pub use matcher::{MatchMode, Matcher, MatcherRole, Style};
