//! # Order / Intent Model
//!
//! Maker-signed economic terms. Never mutated after signing; consumed
//! exactly once by a resolver fill.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::{Address, Hash, Timestamp, ValidationError};
use super::immutables::keccak256;
use super::value_objects::ChainId;

/// Basis-point denominator for auction rate bumps.
pub const BPS_DENOMINATOR: u128 = 10_000;

/// Domain tag prefixed to every order hash.
const ORDER_DOMAIN: &[u8] = b"AtomicSwapOrder/v1";

/// Order hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderHash(pub Hash);

impl fmt::Debug for OrderHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OrderHash(0x{})", hex::encode(self.0))
    }
}

impl fmt::Display for OrderHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0[..8]))
    }
}

/// Dutch auction over the taking amount.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionDetails {
    /// Auction start (source chain time).
    pub start_time: Timestamp,
    /// Seconds until the rate reaches the base taking amount.
    pub duration: u64,
    /// Extra taking amount at auction start, in basis points.
    pub initial_rate_bump_bps: u32,
}

/// Maker-signed swap intent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Replay protection; consumed on fill.
    pub nonce: u64,
    /// Order creator, depositor of the source escrow.
    pub maker: Address,
    /// Maker's receiving address on the destination chain.
    pub receiver: Address,
    /// Asset locked on the source chain.
    pub maker_asset: Address,
    /// Asset delivered on the destination chain.
    pub taker_asset: Address,
    /// Source amount.
    pub making_amount: u128,
    /// Minimum destination amount.
    pub taking_amount: u128,
    /// Source chain.
    pub src_chain_id: ChainId,
    /// Destination chain.
    pub dst_chain_id: ChainId,
    /// Safety deposit on the source escrow.
    pub src_safety_deposit: u128,
    /// Safety deposit on the destination escrow.
    pub dst_safety_deposit: u128,
    /// Auction parameters.
    pub auction: AuctionDetails,
    /// Resolvers allowed to fill. Empty means anyone.
    pub allowed_resolvers: Vec<Address>,
}

impl Order {
    /// Structural checks, run before signing and before filling.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.making_amount == 0 || self.taking_amount == 0 {
            return Err(ValidationError::ZeroAmount);
        }
        if self.src_chain_id == self.dst_chain_id {
            return Err(ValidationError::InvalidOrder(
                "source and destination chains must differ".to_string(),
            ));
        }
        if self.auction.initial_rate_bump_bps > 0 && self.auction.duration == 0 {
            return Err(ValidationError::InvalidOrder(
                "rate bump requires a non-zero auction duration".to_string(),
            ));
        }
        Ok(())
    }

    /// Keccak-256 over a domain prefix bound to both chain ids, then the fields.
    pub fn hash(&self) -> OrderHash {
        let mut bytes = Vec::with_capacity(256 + 20 * self.allowed_resolvers.len());
        bytes.extend_from_slice(ORDER_DOMAIN);
        bytes.extend_from_slice(&self.src_chain_id.0.to_be_bytes());
        bytes.extend_from_slice(&self.dst_chain_id.0.to_be_bytes());
        bytes.extend_from_slice(&self.nonce.to_be_bytes());
        bytes.extend_from_slice(&self.maker);
        bytes.extend_from_slice(&self.receiver);
        bytes.extend_from_slice(&self.maker_asset);
        bytes.extend_from_slice(&self.taker_asset);
        bytes.extend_from_slice(&self.making_amount.to_be_bytes());
        bytes.extend_from_slice(&self.taking_amount.to_be_bytes());
        bytes.extend_from_slice(&self.src_safety_deposit.to_be_bytes());
        bytes.extend_from_slice(&self.dst_safety_deposit.to_be_bytes());
        bytes.extend_from_slice(&self.auction.start_time.to_be_bytes());
        bytes.extend_from_slice(&self.auction.duration.to_be_bytes());
        bytes.extend_from_slice(&self.auction.initial_rate_bump_bps.to_be_bytes());
        bytes.extend_from_slice(&(self.allowed_resolvers.len() as u32).to_be_bytes());
        for resolver in &self.allowed_resolvers {
            bytes.extend_from_slice(resolver);
        }
        OrderHash(keccak256(&bytes))
    }

    /// Whether `resolver` may fill.
    pub fn is_resolver_allowed(&self, resolver: &Address) -> bool {
        self.allowed_resolvers.is_empty() || self.allowed_resolvers.contains(resolver)
    }

    /// Taking amount at `now`, decaying linearly from the bumped rate.
    pub fn taking_amount_at(&self, now: Timestamp) -> Result<u128, ValidationError> {
        let bump = self.auction.initial_rate_bump_bps as u128;
        if bump == 0 {
            return Ok(self.taking_amount);
        }
        let end = self.auction.start_time.saturating_add(self.auction.duration);
        let remaining = end.saturating_sub(now.max(self.auction.start_time)) as u128;
        let current_bump = bump * remaining / self.auction.duration as u128;
        self.taking_amount
            .checked_mul(BPS_DENOMINATOR + current_bump)
            .map(|v| v / BPS_DENOMINATOR)
            .ok_or_else(|| ValidationError::InvalidOrder("taking amount overflow".to_string()))
    }
}

/// Recoverable secp256k1 signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// R component.
    pub r: [u8; 32],
    /// S component.
    pub s: [u8; 32],
    /// Recovery id (27 or 28).
    pub v: u8,
}

/// An order plus the maker's signature over its hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedOrder {
    /// Order terms.
    pub order: Order,
    /// Maker signature.
    pub signature: Signature,
}

/// Resolver-side fill parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TakerParams {
    /// Filling resolver.
    pub resolver: Address,
    /// Source chain time of the fill.
    pub fill_time: Timestamp,
}

/// Outcome of a successful match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillResult {
    /// Filled order.
    pub order_hash: OrderHash,
    /// Resolver that won the fill.
    pub resolver: Address,
    /// Source amount locked.
    pub making_amount: u128,
    /// Destination amount owed to the maker.
    pub taking_amount: u128,
    /// Consumed nonce.
    pub nonce: u64,
    /// Fill time.
    pub filled_at: Timestamp,
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn sample_order() -> Order {
        Order {
            nonce: 7,
            maker: [0xA1; 20],
            receiver: [0xA2; 20],
            maker_asset: [0xB1; 20],
            taker_asset: [0xB2; 20],
            making_amount: 1_000_000,
            taking_amount: 2_000_000,
            src_chain_id: ChainId(1),
            dst_chain_id: ChainId(2),
            src_safety_deposit: 100,
            dst_safety_deposit: 100,
            auction: AuctionDetails::default(),
            allowed_resolvers: vec![],
        }
    }
}
