//! Shared fixtures for router-level tests

use std::sync::Arc;

use agentwatch_core::{Broker, BrokerMessage, BrokerSubscription, Error, MemoryKeySpace, Result};
use agentwatch_store::EventStore;
use async_trait::async_trait;
use axum::Router;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::config::AppConfig;
use super::{build_router, ServiceBundle};

/// Broker that refuses every subscription
pub struct RefusingBroker;

#[async_trait]
impl Broker for RefusingBroker {
    async fn subscribe(&self, _channels: &[String]) -> Result<Box<dyn BrokerSubscription>> {
        Err(Error::Broker("connection refused".to_string()))
    }

    fn name(&self) -> &str {
        "refusing"
    }
}

/// Broker whose subscription replays fixed payloads
///
/// With `hold_open` the subscription idles after the last payload instead of
/// closing.
pub struct ScriptedBroker {
    payloads: Mutex<Vec<String>>,
    hold_open: bool,
}

impl ScriptedBroker {
    pub fn closing(payloads: &[&str]) -> Self {
        Self {
            payloads: Mutex::new(payloads.iter().map(|p| p.to_string()).collect()),
            hold_open: false,
        }
    }

    pub fn idle() -> Self {
        Self {
            payloads: Mutex::new(Vec::new()),
            hold_open: true,
        }
    }
}

struct ScriptedSubscription {
    channel: String,
    payloads: std::vec::IntoIter<String>,
    hold_open: bool,
}

#[async_trait]
impl Broker for ScriptedBroker {
    async fn subscribe(&self, channels: &[String]) -> Result<Box<dyn BrokerSubscription>> {
        let payloads = std::mem::take(&mut *self.payloads.lock().await);
        Ok(Box::new(ScriptedSubscription {
            channel: channels.first().cloned().unwrap_or_default(),
            payloads: payloads.into_iter(),
            hold_open: self.hold_open,
        }))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[async_trait]
impl BrokerSubscription for ScriptedSubscription {
    async fn next_message(&mut self) -> Option<Result<BrokerMessage>> {
        match self.payloads.next() {
            Some(payload) => Some(Ok(BrokerMessage::new(self.channel.clone(), payload))),
            None if self.hold_open => futures::future::pending().await,
            None => None,
        }
    }

    async fn unsubscribe(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Services around an in-memory store and key-space
pub async fn test_services(config: &AppConfig, broker: Arc<dyn Broker>) -> ServiceBundle {
    let store = Arc::new(EventStore::in_memory().await.unwrap());
    ServiceBundle::assemble(
        config,
        store,
        broker,
        Arc::new(MemoryKeySpace::new()),
        CancellationToken::new(),
    )
}

/// Router plus the services behind it
pub async fn test_app_with(config: AppConfig, broker: Arc<dyn Broker>) -> (Router, ServiceBundle) {
    let services = test_services(&config, broker).await;
    let router = build_router(&services, Arc::new(config));
    (router, services)
}

/// Router with default configuration and a refusing broker
pub async fn test_app() -> (Router, ServiceBundle) {
    test_app_with(AppConfig::default(), Arc::new(RefusingBroker)).await
}
