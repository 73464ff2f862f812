//! Server module for Agentwatch
//!
//! Contains the main server initialization and runtime logic.
//!
//! # Module Structure
//!
//! - `config`: Configuration structures for all server components
//! - `loader`: Configuration loading from files and environment
//! - `validation`: Configuration validation
//! - `init_stores`: Event store and service wiring
//! - `init`: Router assembly and run loop

pub mod config;
mod init;
mod init_stores;
mod loader;
mod validation;

#[cfg(test)]
pub(crate) mod testing;

// Re-export public API
pub use init::{build_router, run};
pub use init_stores::ServiceBundle;
pub use loader::load_config;
pub use validation::validate_config;
