//! # Maker → Resolver Handoff
//!
//! The maker step prepares the source deployment and writes everything
//! the resolver step needs; the resolver step rebuilds the swap from it.

use tracing::info;

use crate::config::SwapConfig;
use crate::domain::{
    FillResult, HashLock, Secret, SecretVault, Side, SignedOrder, Swap, SwapError, SwapHandoff,
    Timestamp, Transaction,
};

/// Build the handoff for a filled order.
///
/// Source timelocks are resolved against `creation_time`, the source
/// chain time at which the deploy will be submitted.
pub fn prepare_handoff(
    config: &SwapConfig,
    signed_order: SignedOrder,
    fill: FillResult,
    secret: Secret,
    creation_time: Timestamp,
) -> Result<SwapHandoff, SwapError> {
    let hash_lock = HashLock::commit(&secret);
    let mut swap = Swap::open(
        signed_order.order.clone(),
        fill,
        hash_lock,
        config.source_leg(),
        config.destination_leg(),
    )?;
    let immutables = swap.source.prepare_deployment(creation_time)?.immutables.clone();

    let handoff = SwapHandoff {
        order_hash: swap.order_hash,
        resolver_txn_data: Transaction::Deploy {
            side: Side::Source,
            immutables,
            source_cancellation: None,
        },
        secret,
        maker_amount: fill.making_amount,
        taker_amount: fill.taking_amount,
        signed_order,
        fill,
    };
    handoff.validate()?;
    info!(
        "[swap] Prepared handoff for order {} (hashlock {})",
        handoff.order_hash, hash_lock
    );
    Ok(handoff)
}

/// Rebuild the swap recorded in a handoff.
pub fn resume_handoff(
    config: &SwapConfig,
    handoff: &SwapHandoff,
) -> Result<(Swap, SecretVault), SwapError> {
    handoff.validate()?;
    let vault = SecretVault::new(handoff.secret.clone());
    let mut swap = Swap::open(
        handoff.signed_order.order.clone(),
        handoff.fill,
        vault.hash_lock(),
        config.source_leg(),
        config.destination_leg(),
    )?;
    swap.source
        .adopt_deployment(handoff.resolver_txn_data.immutables().clone())?;
    Ok((swap, vault))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::{generate_secret, prepare_fill};
    use crate::domain::order::test_support::sample_order;
    use crate::domain::{Signature, TakerParams, ValidationError};

    fn filled() -> (SignedOrder, FillResult) {
        let order = sample_order();
        let fill = prepare_fill(
            &order,
            &TakerParams {
                resolver: [0xC1; 20],
                fill_time: 0,
            },
        )
        .unwrap();
        let signed = SignedOrder {
            order,
            signature: Signature {
                r: [1; 32],
                s: [2; 32],
                v: 27,
            },
        };
        (signed, fill)
    }

    #[test]
    fn test_prepare_then_resume_keeps_escrow_ref() {
        let config = SwapConfig::for_testing();
        let (signed, fill) = filled();
        let handoff = prepare_handoff(&config, signed, fill, generate_secret(), 1_000).unwrap();

        let (swap, vault) = resume_handoff(&config, &handoff).unwrap();
        let expected = handoff
            .resolver_txn_data
            .immutables()
            .escrow_ref(config.source.chain_id, Side::Source);
        assert_eq!(swap.source.escrow_ref(), Some(expected));
        assert_eq!(swap.hash_lock, vault.hash_lock());
        assert!(!vault.is_released());
        assert!(swap.destination.deployment.is_none());
    }

    #[test]
    fn test_handoff_amounts_follow_fill() {
        let config = SwapConfig::for_testing();
        let (signed, fill) = filled();
        let handoff = prepare_handoff(&config, signed, fill, generate_secret(), 0).unwrap();
        assert_eq!(handoff.maker_amount, 1_000_000);
        assert_eq!(handoff.taker_amount, 2_000_000);
    }

    #[test]
    fn test_resume_rejects_swapped_secret() {
        let config = SwapConfig::for_testing();
        let (signed, fill) = filled();
        let mut handoff = prepare_handoff(&config, signed, fill, generate_secret(), 0).unwrap();
        handoff.secret = generate_secret();
        assert!(matches!(
            resume_handoff(&config, &handoff),
            Err(SwapError::Validation(ValidationError::ImmutablesMismatch { .. }))
        ));
    }

    #[test]
    fn test_resume_rejects_foreign_timelocks() {
        let config = SwapConfig::for_testing();
        let (signed, fill) = filled();
        let handoff = prepare_handoff(&config, signed, fill, generate_secret(), 0).unwrap();

        let mut other = config.clone();
        other.source_timelocks.cancellation = 150;
        other.source_timelocks.public_cancellation = 200;
        assert!(resume_handoff(&other, &handoff).is_err());
    }
}
