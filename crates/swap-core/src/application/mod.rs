//! # Application Module
//!
//! Application services orchestrating the domain and outbound ports.

pub mod coordinator;
pub mod handoff;
pub mod orders;
pub mod retry;
pub mod watcher;

pub use coordinator::DualEscrowCoordinator;
pub use handoff::{prepare_handoff, resume_handoff};
pub use orders::{match_and_fill, sign_order, verify_order_signature};
pub use retry::with_retry;
pub use watcher::{ChainWatcher, Observation, WatchUpdate};
