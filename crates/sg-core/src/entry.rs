//! The normalized log entry record and its field selector.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A normalized log entry, produced by a provider at ingestion time.
///
/// Entries are never mutated once they leave the provider: ownership moves
/// from the ingestion loop into the pending queue and from there to the sink
/// as part of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Timestamp of the original record (UTC).
    pub timestamp: DateTime<Utc>,
    /// Severity/classification text, e.g. "ERROR". Free-form — providers map
    /// whatever their source emits, they do not enforce a closed set.
    pub kind: String,
    /// Origin identifier (logger name, file name, sender, ...).
    pub source: String,
    /// Originating machine or process.
    pub system: String,
    /// Thread or task identifier at the source.
    pub thread: String,
    /// Message body.
    pub description: String,
    /// Open-ended extra data — an original exception string, the raw wire
    /// payload, anything that has no dedicated field.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl LogEntry {
    /// Entry with the given kind and description, everything else empty and
    /// the timestamp set to now. Providers fill in the remaining fields.
    pub fn new(kind: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            kind: kind.into(),
            source: String::new(),
            system: String::new(),
            thread: String::new(),
            description: description.into(),
            metadata: HashMap::new(),
        }
    }

    /// Resolve a [`MatchField`] selector against this entry.
    ///
    /// `None`, `Classification` and `Host` are reserved selectors with no
    /// backing data and resolve to the empty string.
    pub fn field(&self, field: MatchField) -> &str {
        match field {
            MatchField::Type => &self.kind,
            MatchField::System => &self.system,
            MatchField::Thread => &self.thread,
            MatchField::Source => &self.source,
            MatchField::Description => &self.description,
            MatchField::None | MatchField::Classification | MatchField::Host => "",
        }
    }
}

/// Which entry field a matcher inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchField {
    None,
    /// The severity/classification text ([`LogEntry::kind`]).
    Type,
    System,
    Thread,
    Source,
    Description,
    /// Reserved — no backing data, resolves to the empty string.
    Classification,
    /// Reserved — no backing data, resolves to the empty string.
    Host,
}

impl std::fmt::Display for MatchField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::None => "None",
            Self::Type => "Type",
            Self::System => "System",
            Self::Thread => "Thread",
            Self::Source => "Source",
            Self::Description => "Description",
            Self::Classification => "Classification",
            Self::Host => "Host",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LogEntry {
        LogEntry {
            timestamp: Utc::now(),
            kind: "ERROR".into(),
            source: "billing".into(),
            system: "web-04".into(),
            thread: "17".into(),
            description: "payment declined".into(),
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn field_resolves_backing_data() {
        let entry = sample();
        assert_eq!(entry.field(MatchField::Type), "ERROR");
        assert_eq!(entry.field(MatchField::System), "web-04");
        assert_eq!(entry.field(MatchField::Thread), "17");
        assert_eq!(entry.field(MatchField::Source), "billing");
        assert_eq!(entry.field(MatchField::Description), "payment declined");
    }

    #[test]
    fn reserved_selectors_resolve_empty() {
        let entry = sample();
        assert_eq!(entry.field(MatchField::None), "");
        assert_eq!(entry.field(MatchField::Classification), "");
        assert_eq!(entry.field(MatchField::Host), "");
    }

    #[test]
    fn new_defaults_remaining_fields() {
        let entry = LogEntry::new("INFO", "hello");
        assert_eq!(entry.kind, "INFO");
        assert_eq!(entry.description, "hello");
        assert!(entry.source.is_empty());
        assert!(entry.metadata.is_empty());
    }

    #[test]
    fn field_selector_deserializes_lowercase() {
        let field: MatchField = serde_json::from_str("\"description\"").unwrap();
        assert_eq!(field, MatchField::Description);
    }
}
