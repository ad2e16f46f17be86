//! # Completion and Refund Paths
//!
//! Happy path on both ledger kinds, and the refund path when the
//! destination never gets funded.

#[cfg(test)]
mod tests {
    use swap_core::adapters::NATIVE_ASSET;
    use swap_core::{
        AbortReason, EscrowAction, EscrowState, OrderSigner, SwapCoordinatorApi, SwapOutcome,
        SwapConfig,
    };

    use crate::fixtures::{
        script_destination, World, MAKER_ASSET, MAKING_AMOUNT, SAFETY_DEPOSIT, TAKER_ASSET,
        TAKING_AMOUNT,
    };

    async fn complete(world: &World) {
        let coordinator = world.coordinator();
        let (swap, vault) = world.open(&coordinator, 1).await;
        let report = coordinator.run_swap(swap, vault).await.unwrap();

        assert_eq!(report.outcome, SwapOutcome::Completed);
        assert!(report.secret_revealed);

        let maker = world.maker.address();
        let resolver = world.resolver.address();
        assert_eq!(world.source.balance(&resolver, &MAKER_ASSET), MAKING_AMOUNT);
        assert_eq!(world.source.balance(&maker, &MAKER_ASSET), 0);
        assert_eq!(world.destination.balance(&maker, &TAKER_ASSET), TAKING_AMOUNT);
        assert_eq!(world.destination.balance(&resolver, &TAKER_ASSET), 0);
        assert_eq!(world.source.balance(&resolver, &NATIVE_ASSET), SAFETY_DEPOSIT);
        assert_eq!(
            world.destination.balance(&resolver, &NATIVE_ASSET),
            SAFETY_DEPOSIT
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_contract_to_contract_completes() {
        complete(&World::new(SwapConfig::for_testing())).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_contract_to_script_completes() {
        complete(&World::new(script_destination())).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_unfunded_script_destination_refunds_maker() {
        let world = World::new(script_destination());
        world.destination.stall_deploys(true);
        let coordinator = world.coordinator();
        let (swap, vault) = world.open(&coordinator, 1).await;

        let report = coordinator.run_swap(swap, vault).await.unwrap();
        assert_eq!(report.outcome, SwapOutcome::Refunded);
        assert_eq!(report.source, EscrowState::Cancelled);
        assert!(!report.secret_revealed);
        assert_eq!(
            report.abort_reason,
            Some(AbortReason::DestinationFundingTimeout)
        );

        let maker = world.maker.address();
        let resolver = world.resolver.address();
        assert_eq!(world.source.balance(&maker, &MAKER_ASSET), MAKING_AMOUNT);
        assert_eq!(world.source.balance(&resolver, &NATIVE_ASSET), SAFETY_DEPOSIT);
        assert_eq!(world.source.submission_count(EscrowAction::Withdraw), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_withdraw_secrets_match_hashlock() {
        let world = World::new(script_destination());
        let coordinator = world.coordinator();
        let (swap, vault) = world.open(&coordinator, 1).await;
        let hash_lock = swap.hash_lock;
        coordinator.run_swap(swap, vault).await.unwrap();

        for chain in [&world.source, &world.destination] {
            let withdrawals: Vec<_> = chain
                .submitted()
                .into_iter()
                .filter(|tx| tx.action() == EscrowAction::Withdraw)
                .collect();
            assert_eq!(withdrawals.len(), 1);
            match &withdrawals[0] {
                swap_core::Transaction::Withdraw { secret, caller, .. } => {
                    assert!(hash_lock.matches(secret));
                    assert_eq!(*caller, world.resolver.address());
                }
                other => panic!("unexpected transaction {:?}", other),
            }
        }
    }
}
