//! # Outbound Ports
//!
//! Collaborators the engine drives: ledgers, the order signer, order
//! settlement and handoff persistence.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{
    Address, ChainId, EscrowAction, EscrowRef, EscrowState, Hash, LedgerKind, OrderHash, Secret,
    Signature, SwapError, SwapHandoff, Timestamp, Transaction, TxRef,
};

/// Confirmed on-chain view of one escrow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowStatus {
    /// Confirmed state.
    pub state: EscrowState,
    /// Value actually locked.
    pub locked_amount: u128,
    /// Asset actually locked.
    pub locked_asset: Address,
    /// Safety deposit held.
    pub safety_deposit: u128,
}

/// Restartable event query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EventFilter {
    /// Escrow of interest.
    pub escrow: EscrowRef,
    /// Return events with `index >= from_index`.
    pub from_index: u64,
}

/// Confirmed ledger event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainEvent {
    /// Monotonic position in the ledger's event log.
    pub index: u64,
    /// Transaction that produced it.
    pub tx: TxRef,
    /// Escrow it concerns.
    pub escrow: EscrowRef,
    /// Payload.
    pub kind: ChainEventKind,
}

/// Event payloads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChainEventKind {
    /// Escrow created and funded.
    Deployed,
    /// Withdrawal confirmed; the secret is now public.
    Withdrawn {
        /// Revealed preimage
        secret: Secret,
    },
    /// Cancellation confirmed.
    Cancelled,
    /// Submitted transaction rejected by the escrow.
    Reverted {
        /// Rejected command
        action: EscrowAction,
        /// Rejection reason
        reason: String,
    },
}

/// One ledger, seen through the capabilities the coordinator needs.
///
/// Source and destination ledgers are driven through the same interface.
#[async_trait]
pub trait ChainAdapter: Send + Sync {
    /// Ledger identifier.
    fn chain_id(&self) -> ChainId;

    /// Enforcement model.
    fn kind(&self) -> LedgerKind;

    /// Submit a command. Acceptance into the mempool, not confirmation.
    async fn submit(&self, tx: Transaction) -> Result<TxRef, SwapError>;

    /// Confirmed state; `None` while the escrow does not exist on chain.
    async fn confirmed_state(&self, escrow: &EscrowRef)
        -> Result<Option<EscrowStatus>, SwapError>;

    /// Latest confirmed chain time.
    async fn current_time(&self) -> Result<Timestamp, SwapError>;

    /// Confirmed events matching the filter. Finite per call.
    async fn watch_events(&self, filter: &EventFilter) -> Result<Vec<ChainEvent>, SwapError>;
}

/// Off-chain order signing service.
#[async_trait]
pub trait OrderSigner: Send + Sync {
    /// Signer address.
    fn address(&self) -> Address;

    /// Sign a 32-byte digest.
    async fn sign(&self, digest: &Hash) -> Result<Signature, SwapError>;

    /// Recover the address that produced `signature` over `digest`.
    fn recover(&self, digest: &Hash, signature: &Signature) -> Result<Address, SwapError>;
}

/// Enforces single use of `(maker, nonce)`.
#[async_trait]
pub trait OrderSettlement: Send + Sync {
    /// Consume the nonce. Fails with `OrderAlreadyFilled` on reuse.
    async fn consume(
        &self,
        maker: &Address,
        nonce: u64,
        order_hash: &OrderHash,
    ) -> Result<(), SwapError>;

    /// Whether the nonce was consumed.
    async fn is_consumed(&self, maker: &Address, nonce: u64) -> Result<bool, SwapError>;
}

/// Persistence for the maker → resolver handoff.
#[async_trait]
pub trait HandoffStore: Send + Sync {
    /// Write the artifact.
    async fn save(&self, handoff: &SwapHandoff) -> Result<(), SwapError>;

    /// Read the artifact for an order, if present.
    async fn load(&self, order_hash: &OrderHash) -> Result<Option<SwapHandoff>, SwapError>;

    /// Delete the artifact once the swap settled.
    async fn remove(&self, order_hash: &OrderHash) -> Result<(), SwapError>;
}
