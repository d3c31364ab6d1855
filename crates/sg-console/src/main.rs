//! Spyglass console runner.
//!
//! Builds the configured providers, wires them to a filtering stdout sink,
//! and runs until interrupted.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use sg_console::config::ConsoleConfig;
use sg_console::sink::ConsoleSink;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "sg-console starting");

    // ── Load config ─────────────────────────────────────────────
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "spyglass.toml".to_string());
    let config = ConsoleConfig::from_file(&config_path)?;

    let providers = config.build_providers();
    if providers.is_empty() {
        anyhow::bail!("no providers configured in {config_path}");
    }
    tracing::info!(
        provider_count = providers.len(),
        filter_count = config.filter.len(),
        highlighter_count = config.highlighter.len(),
        "config loaded"
    );

    // ── Matching services + sink ────────────────────────────────
    let filters = config.build_filters()?;
    let highlighters = config.build_highlighters()?;
    let sink = Arc::new(ConsoleSink::new(filters, highlighters));

    // ── Start providers ─────────────────────────────────────────
    for provider in &providers {
        provider.start(sink.clone())?;
        tracing::info!(provider = provider.name(), summary = %provider.summary(), "provider started");
    }

    tracing::info!("sg-console ready");

    // ── Run until interrupted ───────────────────────────────────
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");

    for provider in &providers {
        provider.close().await;
    }

    tracing::info!("sg-console stopped");
    Ok(())
}
