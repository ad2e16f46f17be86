//! # Swap Runtime Library
//!
//! Modules behind the `swap-runtime` binary, exposed for testing.
//!
//! - `config/` - Environment and file configuration
//! - `flow/` - Maker and resolver steps against in-memory ledgers

#![warn(missing_docs)]

pub mod config;
pub mod flow;

pub use config::{load_config, load_config_from, RuntimeConfig};
pub use flow::{demo_order, maker_step, resolver_step, Ledgers};
