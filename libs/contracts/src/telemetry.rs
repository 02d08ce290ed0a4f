//! Tracing subscriber setup shared by platform services.

use anyhow::Result;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs a JSON subscriber. `RUST_LOG` wins over `log_level` when set.
///
/// Fails when `log_level` is not a valid filter or when a global
/// subscriber is already installed.
pub fn init(log_level: &str) -> Result<()> {
    let filter = env_filter(std::env::var("RUST_LOG").ok().as_deref(), log_level)?;
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json())
        .try_init()?;
    Ok(())
}

/// A non-empty, parseable `rust_log` takes precedence over `log_level`.
fn env_filter(rust_log: Option<&str>, log_level: &str) -> Result<EnvFilter, ParseError> {
    if let Some(directives) = rust_log.filter(|d| !d.trim().is_empty()) {
        if let Ok(filter) = EnvFilter::try_new(directives) {
            return Ok(filter);
        }
    }
    EnvFilter::try_new(log_level)
}
