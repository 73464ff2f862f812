//! Agentwatch Store - Event log
//!
//! This crate provides the durable event log behind the dashboard:
//! - Event: ingestion input and stored event schemas
//! - Store: Event persistence (SQLite) and indexed queries

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod event;
pub mod store;

pub use error::{Error, Result};
pub use event::{FilterOptions, NewEvent, StoredEvent};
pub use store::{default_data_dir, default_db_path, EventQuery, EventStore, EventStoreTrait};
