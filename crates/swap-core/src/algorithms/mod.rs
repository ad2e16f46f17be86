//! # Algorithms Module
//!
//! Hashlock operations, order hashing/matching and the swap planner.

pub mod hashlock;
pub mod order;
pub mod planner;

pub use hashlock::{commit, generate_secret, verify, verify_bytes};
pub use order::{hash_order, prepare_fill, signing_digest};
pub use planner::{plan, settled_outcome, Action, Clocks, Plan, PlanContext, WaitFor};
