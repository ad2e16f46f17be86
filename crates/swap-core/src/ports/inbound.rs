//! # Inbound Ports
//!
//! API trait defining what the swap engine offers its callers.

use async_trait::async_trait;

use crate::domain::{
    FillResult, HashLock, Order, SecretVault, Swap, SwapError, SwapHandoff, SwapReport,
};

/// Dual-escrow coordinator API - inbound port.
#[async_trait]
pub trait SwapCoordinatorApi: Send + Sync {
    /// Bind a verified, filled order to a hashlock and both configured legs.
    ///
    /// Fails with `HashLockReused` if the hashlock already commits a
    /// different order.
    fn open_swap(&self, order: &Order, fill: FillResult, hash_lock: HashLock)
        -> Result<Swap, SwapError>;

    /// Rebuild a swap and its sealed secret from a maker-side handoff.
    ///
    /// The source escrow adopts the immutables recorded in the handoff.
    fn resume_swap(&self, handoff: &SwapHandoff) -> Result<(Swap, SecretVault), SwapError>;

    /// Drive both escrows until each one reaches a final state.
    ///
    /// The secret leaves `vault` only after the destination escrow is
    /// confirmed funded.
    async fn run_swap(&self, swap: Swap, vault: SecretVault) -> Result<SwapReport, SwapError>;
}
