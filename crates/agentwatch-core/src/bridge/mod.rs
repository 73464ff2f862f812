//! Pub/Sub bridge
//!
//! Each streaming request opens its own broker subscription; nothing is
//! shared between relays. Messages are forwarded unmodified. The relay task
//! owns the subscription and unsubscribes whenever it stops, whether the
//! client went away, the server is shutting down, or the broker failed.

mod broker;
mod redis_broker;
mod relay;


pub use broker::{Broker, BrokerMessage, BrokerSubscription};
pub use redis_broker::RedisBroker;
pub use relay::{BridgeFrame, PubSubBridge, RelayStream};
