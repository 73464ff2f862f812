//! Agentwatch Core - live distribution and aggregation
//!
//! This crate provides the real-time layer of the agentwatch dashboard:
//! - Hub: registry of live push connections fed by the event log
//! - Bridge: per-request relay from broker channels to a streaming response
//! - Aggregate: query-time merge of external task and log records into one feed
//! - Shutdown: coordinated graceful shutdown

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod aggregate;
pub mod bridge;
pub mod error;
pub mod hub;
pub mod shutdown;

pub use aggregate::{
    AggregateDiagnostics, AggregateReport, KeyDescriptor, KeyKind, KeySpace, LogType,
    MemoryKeySpace, RecordFamily, RedisKeySpace, SynthesisOptions, TextItems, UnifiedAggregator,
    UnifiedLogEntry,
};
pub use bridge::{
    BridgeFrame, Broker, BrokerMessage, BrokerSubscription, PubSubBridge, RedisBroker,
    RelayStream,
};
pub use error::{Error, Result};
pub use hub::{ConnectionManager, PushConnection, PushFrame};
pub use shutdown::{
    shutdown_signal_with_controller, wait_for_shutdown_signal, ShutdownController, ShutdownPhase,
};
