//! # Order Flow
//!
//! Maker signs, resolver verifies and fills. The fill consumes the
//! maker's nonce through the settlement port, so a second fill of the
//! same order is rejected there.

use tracing::{info, warn};

use crate::algorithms::{prepare_fill, signing_digest};
use crate::domain::{FillResult, Order, SignedOrder, SwapError, TakerParams, ValidationError};
use crate::ports::outbound::{OrderSettlement, OrderSigner};

/// Sign an order as its maker.
///
/// The signer must control the order's maker address.
pub async fn sign_order(order: &Order, signer: &dyn OrderSigner) -> Result<SignedOrder, SwapError> {
    order.validate()?;
    if signer.address() != order.maker {
        return Err(ValidationError::InvalidOrder(format!(
            "signer 0x{} is not the maker 0x{}",
            hex::encode(signer.address()),
            hex::encode(order.maker)
        ))
        .into());
    }
    let order_hash = order.hash();
    let signature = signer.sign(&signing_digest(&order_hash)).await?;
    info!("[swap] Signed order {} (nonce {})", order_hash, order.nonce);
    Ok(SignedOrder {
        order: order.clone(),
        signature,
    })
}

/// Check that the signature recovers the maker.
pub fn verify_order_signature(
    signed: &SignedOrder,
    signer: &dyn OrderSigner,
) -> Result<(), SwapError> {
    let digest = signing_digest(&signed.order.hash());
    let recovered = signer.recover(&digest, &signed.signature)?;
    if recovered != signed.order.maker {
        warn!(
            "[swap] Order signature recovers 0x{}, maker is 0x{}",
            hex::encode(recovered),
            hex::encode(signed.order.maker)
        );
        return Err(ValidationError::InvalidSignature.into());
    }
    Ok(())
}

/// Verify, price and consume an order for one resolver.
pub async fn match_and_fill(
    signed: &SignedOrder,
    taker: &TakerParams,
    signer: &dyn OrderSigner,
    settlement: &dyn OrderSettlement,
) -> Result<FillResult, SwapError> {
    verify_order_signature(signed, signer)?;
    let fill = prepare_fill(&signed.order, taker)?;
    settlement
        .consume(&signed.order.maker, signed.order.nonce, &fill.order_hash)
        .await?;
    info!(
        "[swap] Order {} filled by 0x{}: {} -> {}",
        fill.order_hash,
        hex::encode(fill.resolver),
        fill.making_amount,
        fill.taking_amount
    );
    Ok(fill)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{EcdsaOrderSigner, InMemorySettlement};
    use crate::domain::order::test_support::sample_order;
    use crate::domain::ChainId;
    use tokio_test::{assert_err, assert_ok};

    fn maker_order(signer: &EcdsaOrderSigner) -> Order {
        let mut order = sample_order();
        order.maker = signer.address();
        order
    }

    fn taker() -> TakerParams {
        TakerParams {
            resolver: [0xC1; 20],
            fill_time: 10,
        }
    }

    #[tokio::test]
    async fn test_sign_then_verify() {
        let signer = EcdsaOrderSigner::random();
        let signed = sign_order(&maker_order(&signer), &signer).await.unwrap();
        assert_ok!(verify_order_signature(&signed, &signer));
    }

    #[tokio::test]
    async fn test_signing_is_deterministic() {
        let signer = EcdsaOrderSigner::random();
        let order = maker_order(&signer);
        let a = sign_order(&order, &signer).await.unwrap();
        let b = sign_order(&order, &signer).await.unwrap();
        assert_eq!(a.signature, b.signature);
    }

    #[tokio::test]
    async fn test_sign_rejects_foreign_maker() {
        let signer = EcdsaOrderSigner::random();
        let result = sign_order(&sample_order(), &signer).await;
        assert!(matches!(
            result,
            Err(SwapError::Validation(ValidationError::InvalidOrder(_)))
        ));
    }

    #[tokio::test]
    async fn test_tampered_order_fails_verification() {
        let signer = EcdsaOrderSigner::random();
        let mut signed = sign_order(&maker_order(&signer), &signer).await.unwrap();
        signed.order.taking_amount -= 1;
        assert!(matches!(
            verify_order_signature(&signed, &signer),
            Err(SwapError::Validation(ValidationError::InvalidSignature))
        ));
    }

    #[tokio::test]
    async fn test_signature_bound_to_chain_id() {
        let signer = EcdsaOrderSigner::random();
        let mut signed = sign_order(&maker_order(&signer), &signer).await.unwrap();
        signed.order.dst_chain_id = ChainId(3);
        assert_err!(verify_order_signature(&signed, &signer));
    }

    #[tokio::test]
    async fn test_fill_consumes_nonce_once() {
        let maker = EcdsaOrderSigner::random();
        let resolver = EcdsaOrderSigner::random();
        let settlement = InMemorySettlement::new();
        let signed = sign_order(&maker_order(&maker), &maker).await.unwrap();

        let fill = match_and_fill(&signed, &taker(), &resolver, &settlement)
            .await
            .unwrap();
        assert_eq!(fill.nonce, signed.order.nonce);
        assert!(settlement
            .is_consumed(&signed.order.maker, signed.order.nonce)
            .await
            .unwrap());

        let second = match_and_fill(&signed, &taker(), &resolver, &settlement).await;
        assert!(matches!(second, Err(SwapError::OrderAlreadyFilled { nonce: 7 })));
    }

    #[tokio::test]
    async fn test_rejected_fill_leaves_nonce_unused() {
        let maker = EcdsaOrderSigner::random();
        let settlement = InMemorySettlement::new();
        let mut order = maker_order(&maker);
        order.allowed_resolvers = vec![[0x22; 20]];
        let signed = sign_order(&order, &maker).await.unwrap();

        assert_err!(match_and_fill(&signed, &taker(), &maker, &settlement).await);
        assert!(!settlement.is_consumed(&order.maker, order.nonce).await.unwrap());
    }
}
