//! # Swap Handoff
//!
//! Artifact written by the maker-side step and read by the resolver-side
//! step, so the two can run as separate processes without re-deriving
//! the secret.

use serde::{Deserialize, Serialize};

use super::errors::ValidationError;
use super::order::{FillResult, OrderHash, SignedOrder};
use super::secure_secret::{HashLock, Secret};
use super::transaction::Transaction;
use super::value_objects::Side;

/// Persisted handoff record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapHandoff {
    /// Order being settled.
    pub order_hash: OrderHash,
    /// Source escrow deployment the resolver submits.
    pub resolver_txn_data: Transaction,
    /// Swap secret. Sensitive.
    pub secret: Secret,
    /// Source amount.
    pub maker_amount: u128,
    /// Destination amount.
    pub taker_amount: u128,
    /// Maker-signed order.
    pub signed_order: SignedOrder,
    /// Matched fill.
    pub fill: FillResult,
}

impl SwapHandoff {
    /// Internal consistency check run after loading.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.signed_order.order.hash() != self.order_hash || self.fill.order_hash != self.order_hash
        {
            return Err(ValidationError::InvalidOrder(
                "handoff order hash mismatch".to_string(),
            ));
        }
        let Transaction::Deploy { side, immutables, .. } = &self.resolver_txn_data else {
            return Err(ValidationError::ImmutablesMismatch {
                side: Side::Source,
                field: "resolver_txn_data is not a deploy".to_string(),
            });
        };
        if *side != Side::Source || immutables.order_hash != self.order_hash {
            return Err(ValidationError::ImmutablesMismatch {
                side: *side,
                field: "order_hash".to_string(),
            });
        }
        if immutables.hash_lock != HashLock::commit(&self.secret) {
            return Err(ValidationError::ImmutablesMismatch {
                side: Side::Source,
                field: "hash_lock".to_string(),
            });
        }
        if immutables.amount != self.maker_amount || self.fill.taking_amount != self.taker_amount {
            return Err(ValidationError::ImmutablesMismatch {
                side: Side::Source,
                field: "amount".to_string(),
            });
        }
        Ok(())
    }
}
