//! Service initialization
//!
//! Opens the event store and wires the hub, bridge and aggregator around it.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use agentwatch_core::{
    Broker, ConnectionManager, KeySpace, PubSubBridge, RedisBroker, RedisKeySpace,
    SynthesisOptions, UnifiedAggregator,
};
use agentwatch_store::EventStore;

use super::config::AppConfig;

/// Everything the router needs
pub struct ServiceBundle {
    pub event_store: Arc<EventStore>,
    pub hub: Arc<ConnectionManager>,
    pub bridge: Arc<PubSubBridge>,
    pub aggregator: Arc<UnifiedAggregator>,
}

impl ServiceBundle {
    /// Wire services around an opened store and external backends
    pub fn assemble(
        config: &AppConfig,
        event_store: Arc<EventStore>,
        broker: Arc<dyn Broker>,
        keyspace: Arc<dyn KeySpace>,
        shutdown: CancellationToken,
    ) -> Self {
        let hub = Arc::new(ConnectionManager::new(config.hub.send_buffer));

        let bridge = Arc::new(
            PubSubBridge::new(broker, config.bridge.relay_buffer).with_shutdown(shutdown),
        );

        let mut aggregator = UnifiedAggregator::new(keyspace).with_options(SynthesisOptions {
            output_preview_lines: config.aggregator.output_preview_lines,
        });
        if config.aggregator.include_events {
            aggregator = aggregator.with_events(event_store.clone(), config.aggregator.event_window);
        }

        Self {
            event_store,
            hub,
            bridge,
            aggregator: Arc::new(aggregator),
        }
    }
}

/// Open the event store and connect the Redis-backed services
pub async fn init_stores(
    config: &AppConfig,
    data_dir: &Path,
    shutdown: CancellationToken,
) -> Result<ServiceBundle> {
    let db_path = data_dir.join("events.db");
    let event_store = Arc::new(
        EventStore::from_path(&db_path)
            .await
            .context("Failed to initialize SQLite event store")?,
    );

    // Connections are opened lazily; an unreachable Redis only affects
    // relays and the unified feed.
    let client = redis::Client::open(config.redis.url.as_str()).context("Invalid Redis URL")?;
    let broker: Arc<dyn Broker> = Arc::new(RedisBroker::from_client(client.clone()));
    let keyspace: Arc<dyn KeySpace> = Arc::new(RedisKeySpace::from_client(client));
    info!("Redis backend configured at {}", config.redis.url);

    Ok(ServiceBundle::assemble(
        config,
        event_store,
        broker,
        keyspace,
        shutdown,
    ))
}
