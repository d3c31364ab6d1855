//! Runner configuration, loadable from TOML.

use serde::Deserialize;

use sg_core::MatchField;
use sg_match::{
    FilteringService, HighlightingService, MatchMode, Matcher, Style,
};
use sg_providers::{
    DbPollProvider, DbPollSettings, FileTailProvider, FileTailSettings, LogProvider,
    UdpListenerProvider, UdpListenerSettings,
};

/// Top-level configuration for the console runner.
///
/// ```toml
/// [[provider]]
/// kind = "udp"
/// name = "nlog feed"
/// port = 9999
///
/// [[filter]]
/// name = "errors only"
/// field = "type"
/// pattern = "ERROR"
///
/// [[highlighter]]
/// name = "failures"
/// field = "description"
/// mode = "case_insensitive"
/// pattern = "fail"
/// style = { foreground = "red" }
/// ```
#[derive(Debug, Deserialize)]
pub struct ConsoleConfig {
    /// Providers to run.
    #[serde(default)]
    pub provider: Vec<ProviderConfig>,
    /// Admission filters, enabled unless stated otherwise.
    #[serde(default)]
    pub filter: Vec<FilterRule>,
    /// Highlighters, first match wins.
    #[serde(default)]
    pub highlighter: Vec<HighlighterRule>,
}

/// One provider, tagged by kind.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProviderConfig {
    File(FileTailSettings),
    Database(DbPollSettings),
    Udp(UdpListenerSettings),
}

fn default_enabled() -> bool {
    true
}

fn default_mode() -> MatchMode {
    MatchMode::Exact
}

/// A filter rule block.
#[derive(Debug, Deserialize)]
pub struct FilterRule {
    pub name: String,
    pub field: MatchField,
    #[serde(default = "default_mode")]
    pub mode: MatchMode,
    pub pattern: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// A highlighter rule block.
#[derive(Debug, Deserialize)]
pub struct HighlighterRule {
    pub name: String,
    pub field: MatchField,
    #[serde(default = "default_mode")]
    pub mode: MatchMode,
    pub pattern: String,
    #[serde(default)]
    pub style: Style,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl ConsoleConfig {
    /// Load config from a TOML file path.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Build the configured providers.
    pub fn build_providers(&self) -> Vec<Box<dyn LogProvider>> {
        self.provider
            .iter()
            .map(|p| -> Box<dyn LogProvider> {
                match p {
                    ProviderConfig::File(settings) => {
                        Box::new(FileTailProvider::new(settings.clone()))
                    }
                    ProviderConfig::Database(settings) => {
                        Box::new(DbPollProvider::new(settings.clone()))
                    }
                    ProviderConfig::Udp(settings) => {
                        Box::new(UdpListenerProvider::new(settings.clone()))
                    }
                }
            })
            .collect()
    }

    /// Filtering service seeded with the standard level filters plus the
    /// configured rules.
    pub fn build_filters(&self) -> anyhow::Result<FilteringService> {
        let service = FilteringService::with_standard_filters();
        for rule in &self.filter {
            let mut matcher = Matcher::filter(rule.name.as_str(), rule.field, rule.pattern.as_str());
            matcher.set_mode(rule.mode);
            matcher.set_enabled(rule.enabled);
            service.add(matcher)?;
        }
        Ok(service)
    }

    /// Highlighting service built from the configured rules.
    pub fn build_highlighters(&self) -> anyhow::Result<HighlightingService> {
        let service = HighlightingService::new();
        for rule in &self.highlighter {
            let mut matcher = Matcher::highlighter(
                rule.name.as_str(),
                rule.field,
                rule.mode,
                rule.pattern.as_str(),
                rule.style.clone(),
            );
            matcher.set_enabled(rule.enabled);
            service.add(matcher)?;
        }
        Ok(service)
    }
}
