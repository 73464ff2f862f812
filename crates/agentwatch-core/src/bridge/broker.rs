//! Broker abstraction

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A message received on a broker channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerMessage {
    /// Channel the message arrived on
    pub channel: String,
    /// Raw payload, relayed as-is
    pub payload: String,
}

impl BrokerMessage {
    /// Create a message
    pub fn new(channel: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            payload: payload.into(),
        }
    }
}

/// A pub/sub broker able to open independent subscriptions
#[async_trait]
pub trait Broker: Send + Sync {
    /// Open a dedicated subscription to `channels`
    ///
    /// An error here means the relay never became live.
    async fn subscribe(&self, channels: &[String]) -> Result<Box<dyn BrokerSubscription>>;

    /// Broker name for logs and health output
    fn name(&self) -> &str;
}

/// One open subscription, owned by exactly one relay
#[async_trait]
pub trait BrokerSubscription: Send {
    /// Next message; `None` when the broker closed the subscription
    async fn next_message(&mut self) -> Option<Result<BrokerMessage>>;

    /// Unsubscribe from every channel and release the connection
    async fn unsubscribe(&mut self) -> Result<()>;
}
