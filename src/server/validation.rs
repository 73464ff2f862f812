//! Configuration validation
//!
//! Rejects values that would make the service misbehave at runtime and warns
//! about risky production settings.

use super::config::AppConfig;
use super::loader::ENV_VAR;
use anyhow::{bail, Result};
use tracing::warn;

/// Validate configuration before anything is started
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.server.port == 0 {
        bail!("server.port must be non-zero");
    }
    if config.bridge.keepalive_secs == 0 {
        bail!("bridge.keepalive_secs must be non-zero");
    }
    if config.hub.send_buffer == 0 || config.bridge.relay_buffer == 0 {
        bail!("hub.send_buffer and bridge.relay_buffer must be non-zero");
    }
    if config.aggregator.max_limit < 1 {
        bail!("aggregator.max_limit must be at least 1");
    }
    if config.hub.catch_up_limit < 1 || config.hub.catch_up_limit > config.aggregator.max_limit {
        bail!(
            "hub.catch_up_limit must be between 1 and aggregator.max_limit ({})",
            config.aggregator.max_limit
        );
    }
    if config.bridge.default_channels.iter().all(|c| c.trim().is_empty()) {
        bail!("bridge.default_channels must name at least one channel");
    }

    validate_production_config(config);
    Ok(())
}

/// Warn about settings that are fine locally but risky in production
fn validate_production_config(config: &AppConfig) {
    let is_production = std::env::var(ENV_VAR)
        .map(|v| v.to_lowercase() == "production")
        .unwrap_or(false);

    if !is_production {
        return;
    }

    if config.server.host == "0.0.0.0" {
        warn!(
            "SECURITY WARNING: Server is binding to all interfaces (0.0.0.0) in production. \
             Event ingestion is unauthenticated; bind to 127.0.0.1 behind a reverse proxy."
        );
    }

    if config.redis.url.starts_with("redis://") && !config.redis.url.contains('@') {
        warn!(
            "SECURITY WARNING: Redis connection appears to have no authentication in production. \
             Consider enabling Redis AUTH."
        );
    }
}
