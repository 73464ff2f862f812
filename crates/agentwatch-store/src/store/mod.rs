//! Store - Event persistence using SQLite
//!
//! This module provides the storage layer for ingested events.
//! It uses sqlx for async SQLite access (embedded, no external service).

mod event_store;
mod helpers;
mod query;
mod traits;


pub use event_store::EventStore;
pub use helpers::{default_data_dir, default_db_path};
pub use query::EventQuery;
pub use traits::EventStoreTrait;
