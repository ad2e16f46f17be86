//! # Concurrent Swaps
//!
//! One coordinator instance driving several swaps at once. Each swap
//! owns its task state, so they share nothing but the ledgers.

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use swap_core::{EscrowAction, OrderSigner, SwapConfig, SwapCoordinatorApi, SwapOutcome};

    use crate::fixtures::{script_destination, World, TAKER_ASSET, TAKING_AMOUNT};

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_swaps_all_complete() {
        let world = World::new(script_destination());
        let coordinator = world.coordinator();
        let (a, vault_a) = world.open(&coordinator, 1).await;
        let (b, vault_b) = world.open(&coordinator, 2).await;
        let (c, vault_c) = world.open(&coordinator, 3).await;

        let order_hashes: HashSet<_> = [&a, &b, &c]
            .iter()
            .map(|swap| swap.order_hash)
            .collect();
        assert_eq!(order_hashes.len(), 3);

        let (ra, rb, rc) = tokio::join!(
            coordinator.run_swap(a, vault_a),
            coordinator.run_swap(b, vault_b),
            coordinator.run_swap(c, vault_c),
        );
        for report in [ra, rb, rc] {
            assert_eq!(report.unwrap().outcome, SwapOutcome::Completed);
        }

        for chain in [&world.source, &world.destination] {
            assert_eq!(chain.submission_count(EscrowAction::Deploy), 3);
            assert_eq!(chain.submission_count(EscrowAction::Withdraw), 3);
        }
        assert_eq!(
            world
                .destination
                .balance(&world.maker.address(), &TAKER_ASSET),
            3 * TAKING_AMOUNT
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_refused_swap_does_not_disturb_others() {
        let world = World::new(SwapConfig::for_testing());
        let coordinator = world.coordinator();
        let (good, good_vault) = world.open(&coordinator, 1).await;
        let (bad, _) = world.open(&coordinator, 2).await;

        // The second swap's vault holds a foreign secret and is refused up
        // front; the first still completes.
        let foreign = swap_core::SecretVault::new(swap_core::generate_secret());
        let (done, refused) = tokio::join!(
            coordinator.run_swap(good, good_vault),
            coordinator.run_swap(bad, foreign),
        );
        assert_eq!(done.unwrap().outcome, SwapOutcome::Completed);
        assert!(refused.is_err());
        assert_eq!(world.source.submission_count(EscrowAction::Deploy), 1);
    }
}
