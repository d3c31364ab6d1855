//! Immutable provider settings, produced and edited outside the engine.

use serde::Deserialize;
use std::time::Duration;

fn default_refresh_secs() -> u64 {
    5
}

fn default_udp_port() -> u16 {
    9999
}

/// Settings for the file tail provider.
#[derive(Debug, Clone, Deserialize)]
pub struct FileTailSettings {
    /// Display name for the provider instance.
    pub name: String,
    /// Path of the file to tail.
    pub path: String,
    /// How often to check the file for growth, in seconds.
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,
}

impl FileTailSettings {
    pub fn summary(&self) -> String {
        format!("{}: tails {}", self.name, self.path)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }
}

/// Settings for the database poll provider.
#[derive(Debug, Clone, Deserialize)]
pub struct DbPollSettings {
    /// Display name for the provider instance.
    pub name: String,
    /// Database connection string.
    pub connection_string: String,
    /// Table holding the log rows.
    pub table: String,
    /// Poll period in seconds.
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,
    /// When true, the most recent rows are replayed on start instead of
    /// tailing from the current maximum id.
    #[serde(default)]
    pub load_existing_content: bool,
}

impl DbPollSettings {
    pub fn summary(&self) -> String {
        format!(
            "{}: monitors table {} for new log entries",
            self.name, self.table
        )
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }
}

/// Settings for the UDP listener provider.
#[derive(Debug, Clone, Deserialize)]
pub struct UdpListenerSettings {
    /// Display name for the provider instance.
    pub name: String,
    /// Port to receive datagrams on.
    #[serde(default = "default_udp_port")]
    pub port: u16,
}

impl UdpListenerSettings {
    pub fn summary(&self) -> String {
        format!("{}: listens on UDP port {}", self.name, self.port)
    }
}
