//! # Swap Core
//!
//! Hash-time-locked atomic swaps between a contract-based and a
//! script-based ledger.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Exchange value across two independent ledgers so that either both
//! legs settle or both are reversed:
//! - One SHA-256 hashlock commits both escrows to the same secret
//! - Per-side timelock schedules resolved against each escrow's own creation time
//! - The secret is revealed only after the destination escrow is confirmed funded
//!
//! ## Safety Properties
//!
//! | Property | Enforcement |
//! |----------|-------------|
//! | Timelock ordering | `withdrawal < public_withdrawal < cancellation < public_cancellation`, destination cancels first |
//! | No premature disclosure | `SecretVault::release` requires a `DestinationFunded` proof |
//! | Idempotent settlement | Confirmed state re-read before any submission; pending txs block resubmission |
//! | Exact immutables | Every withdraw/cancel carries the immutables recorded at creation |
//!
//! ## Module Structure
//!
//! ```text
//! swap-core/
//! ├── domain/          # Secret, HashLock, timelocks, immutables, escrow, order, swap
//! ├── algorithms/      # Hashlock ops, order hashing/fill, swap planner
//! ├── ports/           # SwapCoordinatorApi, ChainAdapter, OrderSigner, ...
//! ├── application/     # Coordinator, chain watchers, order flow, handoff, retry
//! ├── adapters/        # In-memory ledger, ECDSA signer, settlement, file handoff store
//! └── config.rs        # SwapConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports
pub use adapters::{EcdsaOrderSigner, FileHandoffStore, InMemoryChain, InMemorySettlement};
pub use algorithms::{
    commit, generate_secret, hash_order, plan, prepare_fill, settled_outcome, signing_digest,
    verify, verify_bytes, Clocks, Plan, PlanContext,
};
pub use application::{
    match_and_fill, prepare_handoff, resume_handoff, sign_order, verify_order_signature,
    DualEscrowCoordinator,
};
pub use config::{ChainConfig, RetryPolicy, SwapConfig};
pub use domain::{
    AbortReason, AbsoluteTimelocks, Address, ChainId, Escrow, EscrowAction, EscrowRef, EscrowState,
    FillResult, Hash, HashLock, Immutables, LedgerKind, Order, OrderHash, Secret, SecretVault,
    Side, SignedOrder, Swap, SwapError, SwapHandoff, SwapOutcome, SwapPhase, SwapReport,
    TakerParams, TimelockOffsets, Timestamp, Transaction, TxRef, ValidationError,
};
pub use ports::{
    ChainAdapter, ChainEvent, ChainEventKind, EscrowStatus, EventFilter, HandoffStore,
    OrderSettlement, OrderSigner, SwapCoordinatorApi,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
