//! # Order Hashing and Matching
//!
//! Pure parts of the order flow. Signing and nonce consumption go
//! through ports in `application::orders`.

use crate::domain::{
    keccak256, FillResult, Hash, Order, OrderHash, TakerParams, ValidationError,
};

/// Prefix binding signatures to the 32-byte order hash (EIP-191 personal message).
const SIGNED_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

/// Order hash. Binds both chain ids.
pub fn hash_order(order: &Order) -> OrderHash {
    order.hash()
}

/// Digest the maker signs.
pub fn signing_digest(order_hash: &OrderHash) -> Hash {
    let mut bytes = Vec::with_capacity(SIGNED_MESSAGE_PREFIX.len() + 32);
    bytes.extend_from_slice(SIGNED_MESSAGE_PREFIX);
    bytes.extend_from_slice(&order_hash.0);
    keccak256(&bytes)
}

/// Check a fill against the order terms and price it.
///
/// Signature and nonce checks are the caller's job.
pub fn prepare_fill(order: &Order, taker: &TakerParams) -> Result<FillResult, ValidationError> {
    order.validate()?;
    if !order.is_resolver_allowed(&taker.resolver) {
        return Err(ValidationError::ResolverNotWhitelisted(format!(
            "0x{}",
            hex::encode(taker.resolver)
        )));
    }
    if taker.fill_time < order.auction.start_time {
        return Err(ValidationError::InvalidOrder(format!(
            "auction starts at {}, fill at {}",
            order.auction.start_time, taker.fill_time
        )));
    }
    Ok(FillResult {
        order_hash: order.hash(),
        resolver: taker.resolver,
        making_amount: order.making_amount,
        taking_amount: order.taking_amount_at(taker.fill_time)?,
        nonce: order.nonce,
        filled_at: taker.fill_time,
    })
}
