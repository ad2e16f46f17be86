//! # Integration Scenarios
//!
//! Full swaps through `DualEscrowCoordinator::run_swap` with paused
//! tokio time, so the testing windows (10 s to 181 s) pass instantly.

pub mod concurrent;
pub mod faults;
pub mod flows;
pub mod handoff;
