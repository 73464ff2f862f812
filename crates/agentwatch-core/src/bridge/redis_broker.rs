//! Redis pub/sub broker

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::{PubSubSink, PubSubStream};
use redis::Client;
use tracing::{debug, warn};

use super::broker::{Broker, BrokerMessage, BrokerSubscription};
use crate::error::{Error, Result};

/// Broker backed by Redis, one pub/sub connection per subscription
#[derive(Clone)]
pub struct RedisBroker {
    client: Client,
}

impl RedisBroker {
    /// Create a broker for `url`; no connection is made until a subscription opens
    pub fn new(url: &str) -> Result<Self> {
        let client = Client::open(url).map_err(|e| Error::Broker(e.to_string()))?;
        Ok(Self { client })
    }

    /// Create from an existing client
    #[must_use]
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Broker for RedisBroker {
    async fn subscribe(&self, channels: &[String]) -> Result<Box<dyn BrokerSubscription>> {
        let pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| Error::Broker(format!("failed to connect: {e}")))?;
        let (mut sink, stream) = pubsub.split();

        for channel in channels {
            sink.subscribe(channel)
                .await
                .map_err(|e| Error::Broker(format!("failed to subscribe to {channel}: {e}")))?;
        }

        debug!(channels = ?channels, "Redis subscription opened");
        Ok(Box::new(RedisSubscription {
            sink,
            stream,
            channels: channels.to_vec(),
        }))
    }

    fn name(&self) -> &str {
        "redis"
    }
}

/// Text message for a raw payload; payloads that are not UTF-8 are dropped
fn decode_message(channel: &str, payload: &[u8]) -> Option<BrokerMessage> {
    match std::str::from_utf8(payload) {
        Ok(text) => Some(BrokerMessage::new(channel, text)),
        Err(e) => {
            warn!(channel = %channel, error = %e, "Dropping broker message with non UTF-8 payload");
            None
        }
    }
}

struct RedisSubscription {
    sink: PubSubSink,
    stream: PubSubStream,
    channels: Vec<String>,
}

#[async_trait]
impl BrokerSubscription for RedisSubscription {
    async fn next_message(&mut self) -> Option<Result<BrokerMessage>> {
        loop {
            let msg = self.stream.next().await?;
            if let Some(message) =
                decode_message(msg.get_channel_name(), msg.get_payload_bytes())
            {
                return Some(Ok(message));
            }
        }
    }

    async fn unsubscribe(&mut self) -> Result<()> {
        for channel in &self.channels {
            self.sink
                .unsubscribe(channel)
                .await
                .map_err(|e| Error::Broker(e.to_string()))?;
        }
        debug!(channels = ?self.channels, "Redis subscription closed");
        Ok(())
    }
}
