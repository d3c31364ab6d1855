//! A single matching rule — pattern + field + mode.

use regex::Regex;
use serde::{Deserialize, Serialize};

use sg_core::{LogEntry, MatchField};

/// How a matcher compares its pattern against the selected field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Case-insensitive whole-string equality.
    Exact,
    /// Case-sensitive substring test.
    Contains,
    /// Case-insensitive substring test.
    CaseInsensitive,
    /// Compiled regular expression test.
    RegularExpression,
}

/// How a matcher's boolean result is consumed.
///
/// The role decides only the empty-pattern rule: an unpatterned filter never
/// excludes anything (matches everything), an unpatterned highlighter or
/// extractor never fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatcherRole {
    Filter,
    Highlighter,
    Extractor,
}

/// Opaque presentation tag applied by highlighter-role matchers.
///
/// The engine never interprets the colour strings — whatever renders entries
/// downstream does.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Style {
    #[serde(default)]
    pub foreground: Option<String>,
    #[serde(default)]
    pub background: Option<String>,
}

/// A single named matching rule.
///
/// Field, mode and pattern are mutated only through the setters so the
/// compiled regex always reflects the current state: at most one compiled
/// artifact is live, and an invalid pattern clears it so regular-expression
/// matches fail closed instead of running against a stale pattern.
#[derive(Debug, Clone)]
pub struct Matcher {
    name: String,
    enabled: bool,
    role: MatcherRole,
    field: MatchField,
    mode: MatchMode,
    pattern: String,
    style: Option<Style>,
    regex: Option<Regex>,
}

impl Matcher {
    pub fn new(
        name: impl Into<String>,
        role: MatcherRole,
        field: MatchField,
        mode: MatchMode,
        pattern: impl Into<String>,
    ) -> Self {
        let mut matcher = Self {
            name: name.into(),
            enabled: false,
            role,
            field,
            mode,
            pattern: pattern.into(),
            style: None,
            regex: None,
        };
        matcher.rebuild_regex();
        matcher
    }

    /// Filter-role matcher in the default exact mode.
    pub fn filter(name: impl Into<String>, field: MatchField, pattern: impl Into<String>) -> Self {
        Self::new(name, MatcherRole::Filter, field, MatchMode::Exact, pattern)
    }

    /// Highlighter-role matcher carrying a presentation style.
    pub fn highlighter(
        name: impl Into<String>,
        field: MatchField,
        mode: MatchMode,
        pattern: impl Into<String>,
        style: Style,
    ) -> Self {
        let mut matcher = Self::new(name, MatcherRole::Highlighter, field, mode, pattern);
        matcher.style = Some(style);
        matcher
    }

    /// Extractor-role matcher.
    pub fn extractor(
        name: impl Into<String>,
        field: MatchField,
        mode: MatchMode,
        pattern: impl Into<String>,
    ) -> Self {
        Self::new(name, MatcherRole::Extractor, field, mode, pattern)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Enable in place — convenient when seeding collections.
    pub fn enable(mut self) -> Self {
        self.enabled = true;
        self
    }

    pub fn role(&self) -> MatcherRole {
        self.role
    }

    pub fn field(&self) -> MatchField {
        self.field
    }

    pub fn set_field(&mut self, field: MatchField) {
        self.field = field;
        self.rebuild_regex();
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: MatchMode) {
        self.mode = mode;
        self.rebuild_regex();
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn set_pattern(&mut self, pattern: impl Into<String>) {
        self.pattern = pattern.into();
        self.rebuild_regex();
    }

    pub fn style(&self) -> Option<&Style> {
        self.style.as_ref()
    }

    pub fn set_style(&mut self, style: Option<Style>) {
        self.style = style;
    }

    /// Derived display text, recomputed from the current field/mode/pattern.
    pub fn description(&self) -> String {
        let mode = match self.mode {
            MatchMode::RegularExpression => "RegEx",
            MatchMode::Contains => "Case sensitive",
            MatchMode::CaseInsensitive => "Case insensitive",
            MatchMode::Exact => "Exact",
        };
        format!("{mode} match of {} in the {} field", self.pattern, self.field)
    }

    /// Test an entry against this rule. Pure — mutates neither side.
    pub fn is_match(&self, entry: &LogEntry) -> bool {
        if self.pattern.trim().is_empty() {
            // An unpatterned filter admits everything; an unpatterned
            // highlighter or extractor fires on nothing.
            return self.role == MatcherRole::Filter;
        }

        let target = entry.field(self.field);
        match self.mode {
            MatchMode::Exact => target.to_lowercase() == self.pattern.to_lowercase(),
            MatchMode::Contains => target.contains(&self.pattern),
            MatchMode::CaseInsensitive => {
                target.to_lowercase().contains(&self.pattern.to_lowercase())
            }
            MatchMode::RegularExpression => {
                self.regex.as_ref().is_some_and(|re| re.is_match(target))
            }
        }
    }

    /// Swap the cached regex for one compiled from the current pattern.
    ///
    /// Outside regular-expression mode the cache is dropped. A pattern that
    /// fails to compile also clears it, so matches fail closed until a valid
    /// pattern is supplied.
    fn rebuild_regex(&mut self) {
        self.regex = if self.mode == MatchMode::RegularExpression {
            match Regex::new(&self.pattern) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::debug!(
                        matcher = %self.name,
                        pattern = %self.pattern,
                        error = %e,
                        "pattern failed to compile, regex matches disabled"
                    );
                    None
                }
            }
        } else {
            None
        };
    }
}
