//! Server configuration types

use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub data_dir: Option<String>,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub hub: HubConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub aggregator: AggregatorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4000,
        }
    }
}

/// External key-value store and broker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
        }
    }
}

/// Broadcast hub
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// Stored events replayed to a new viewer
    pub catch_up_limit: i64,
    /// Frames buffered per viewer before eviction
    pub send_buffer: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            catch_up_limit: 50,
            send_buffer: 64,
        }
    }
}

/// Pub/sub bridge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub keepalive_secs: u64,
    /// Channels relayed when a request names none
    pub default_channels: Vec<String>,
    pub relay_buffer: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            keepalive_secs: 30,
            default_channels: vec!["orchestration.events".to_string()],
            relay_buffer: 64,
        }
    }
}

/// Unified log aggregation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    pub default_limit: i64,
    /// Upper bound for every `limit` query parameter
    pub max_limit: i64,
    pub output_preview_lines: usize,
    /// Fold stored events into the unified feed
    pub include_events: bool,
    pub event_window: i64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            default_limit: 100,
            max_limit: 1000,
            output_preview_lines: 5,
            include_events: true,
            event_window: 200,
        }
    }
}

impl AggregatorConfig {
    /// Clamp a requested limit into `1..=max_limit`
    #[must_use]
    pub fn clamp_limit(&self, requested: Option<i64>, default: i64) -> i64 {
        requested.unwrap_or(default).clamp(1, self.max_limit.max(1))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}
