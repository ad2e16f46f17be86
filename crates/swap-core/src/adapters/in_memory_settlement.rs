//! In-Memory Order Settlement
//!
//! Implements `OrderSettlement` with a nonce set per maker.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::warn;

use crate::domain::{Address, OrderHash, SwapError};
use crate::ports::outbound::OrderSettlement;

/// Nonce registry. Each `(maker, nonce)` is consumed at most once.
#[derive(Default)]
pub struct InMemorySettlement {
    consumed: RwLock<HashMap<(Address, u64), OrderHash>>,
}

impl InMemorySettlement {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Order that consumed `(maker, nonce)`, if any.
    pub fn filled_by(&self, maker: &Address, nonce: u64) -> Option<OrderHash> {
        self.consumed.read().get(&(*maker, nonce)).copied()
    }
}

#[async_trait]
impl OrderSettlement for InMemorySettlement {
    async fn consume(
        &self,
        maker: &Address,
        nonce: u64,
        order_hash: &OrderHash,
    ) -> Result<(), SwapError> {
        let mut consumed = self.consumed.write();
        if let Some(previous) = consumed.get(&(*maker, nonce)) {
            warn!(
                "[swap] Nonce {} of 0x{} already consumed by {}",
                nonce,
                hex::encode(maker),
                previous
            );
            return Err(SwapError::OrderAlreadyFilled { nonce });
        }
        consumed.insert((*maker, nonce), *order_hash);
        Ok(())
    }

    async fn is_consumed(&self, maker: &Address, nonce: u64) -> Result<bool, SwapError> {
        Ok(self.consumed.read().contains_key(&(*maker, nonce)))
    }
}
