//! # Immutables
//!
//! Parameters frozen into an escrow at creation. The escrow reference is
//! derived from their hash, so any field changed at withdraw/cancel time
//! points at a different (non-existent) escrow and is rejected.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use super::errors::{Address, Hash, ValidationError};
use super::order::OrderHash;
use super::secure_secret::HashLock;
use super::timelocks::AbsoluteTimelocks;
use super::value_objects::{ChainId, EscrowRef, Side};

/// Keccak-256 digest.
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Economic terms of one escrow, everything except the timelocks.
///
/// Fixed when the order is filled; timelocks are added when the escrow
/// is created on its own chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowTerms {
    /// Order this escrow settles.
    pub order_hash: OrderHash,
    /// Shared commitment.
    pub hash_lock: HashLock,
    /// Order maker.
    pub maker: Address,
    /// Resolver executing the order.
    pub taker: Address,
    /// Locked asset.
    pub asset: Address,
    /// Locked amount.
    pub amount: u128,
    /// Native deposit paid to whoever completes withdraw/cancel.
    pub safety_deposit: u128,
}

impl EscrowTerms {
    /// Bind absolute timelocks, producing the immutables.
    pub fn with_timelocks(&self, timelocks: AbsoluteTimelocks) -> Immutables {
        Immutables {
            order_hash: self.order_hash,
            hash_lock: self.hash_lock,
            maker: self.maker,
            taker: self.taker,
            asset: self.asset,
            amount: self.amount,
            safety_deposit: self.safety_deposit,
            timelocks,
        }
    }
}

/// Frozen escrow parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Immutables {
    /// Order this escrow settles.
    pub order_hash: OrderHash,
    /// Shared commitment.
    pub hash_lock: HashLock,
    /// Order maker.
    pub maker: Address,
    /// Resolver executing the order.
    pub taker: Address,
    /// Locked asset.
    pub asset: Address,
    /// Locked amount.
    pub amount: u128,
    /// Native deposit paid to whoever completes withdraw/cancel.
    pub safety_deposit: u128,
    /// Resolved absolute timelocks.
    pub timelocks: AbsoluteTimelocks,
}

impl Immutables {
    /// Amounts must be positive.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.amount == 0 {
            return Err(ValidationError::ZeroAmount);
        }
        Ok(())
    }

    /// Keccak-256 over the packed layout.
    ///
    /// Layout: order_hash(32) | hashlock(32) | maker(32) | taker(32) |
    /// asset(32) | amount(32) | safety_deposit(32) | timelocks(40).
    /// Addresses and amounts are left-padded to 32 bytes.
    pub fn hash(&self) -> Hash {
        let mut bytes = Vec::with_capacity(32 * 7 + 40);
        bytes.extend_from_slice(&self.order_hash.0);
        bytes.extend_from_slice(&self.hash_lock.0);
        for address in [self.maker, self.taker, self.asset] {
            let mut padded = [0u8; 32];
            padded[12..].copy_from_slice(&address);
            bytes.extend_from_slice(&padded);
        }
        for amount in [self.amount, self.safety_deposit] {
            let mut padded = [0u8; 32];
            padded[16..].copy_from_slice(&amount.to_be_bytes());
            bytes.extend_from_slice(&padded);
        }
        bytes.extend_from_slice(&self.timelocks.pack());
        keccak256(&bytes)
    }

    /// Deterministic escrow reference on `chain` for `side`.
    pub fn escrow_ref(&self, chain: ChainId, side: Side) -> EscrowRef {
        let mut bytes = Vec::with_capacity(8 + 1 + 32);
        bytes.extend_from_slice(&chain.0.to_be_bytes());
        bytes.push(side.tag());
        bytes.extend_from_slice(&self.hash());
        EscrowRef(keccak256(&bytes))
    }
}
