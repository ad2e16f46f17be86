//! # Domain Module
//!
//! Core domain types for the atomic swap engine.

pub mod errors;
pub mod escrow;
pub mod handoff;
pub mod immutables;
pub mod invariants;
pub mod order;
pub mod secure_secret;
pub mod swap;
pub mod timelocks;
pub mod transaction;
pub mod value_objects;

pub use errors::*;
pub use escrow::{Admission, Deployment, DestinationFunded, Escrow, EscrowAction, PendingTx};
pub use handoff::SwapHandoff;
pub use immutables::{keccak256, EscrowTerms, Immutables};
pub use invariants::*;
pub use order::{
    AuctionDetails, FillResult, Order, OrderHash, SignedOrder, Signature, TakerParams,
    BPS_DENOMINATOR,
};
pub use secure_secret::{HashLock, Secret, SecretVault};
pub use swap::{AbortReason, Leg, Swap, SwapOutcome, SwapReport};
pub use timelocks::{AbsoluteTimelocks, Stage, TimelockOffsets, Window};
pub use transaction::Transaction;
pub use value_objects::*;
