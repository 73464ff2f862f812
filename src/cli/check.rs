//! Configuration and backend check

use anyhow::{Context, Result};
use std::path::PathBuf;

use agentwatch_core::{KeySpace, RedisKeySpace};
use agentwatch_store::EventStore;

use crate::server::config::AppConfig;
use crate::server::validate_config;

/// Print a short readiness report
pub async fn run(config: &AppConfig) -> Result<()> {
    validate_config(config)?;
    println!("Configuration     ok");
    println!(
        "  listen          {}:{}",
        config.server.host, config.server.port
    );

    let data_dir = config
        .data_dir
        .clone()
        .map(PathBuf::from)
        .unwrap_or_else(agentwatch_store::default_data_dir);
    let db_path = data_dir.join("events.db");
    let store = EventStore::from_path(&db_path)
        .await
        .context("Failed to open event store")?;
    let count = store.count().await.context("Failed to count events")?;
    store.close().await;
    println!("Event store       ok ({count} events at {})", db_path.display());

    let keyspace = RedisKeySpace::new(&config.redis.url).context("Invalid Redis URL")?;
    match keyspace.ping().await {
        Ok(()) => println!("Redis             ok ({})", config.redis.url),
        Err(e) => println!("Redis             unreachable: {e}"),
    }

    Ok(())
}
