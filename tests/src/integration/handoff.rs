//! # Maker → Resolver Handoff
//!
//! The maker step writes the handoff file; a separate resolver, with
//! its own coordinator, resumes from it.

#[cfg(test)]
mod tests {
    use swap_core::{
        generate_secret, prepare_handoff, verify_order_signature, ChainAdapter, EscrowAction,
        FileHandoffStore, HandoffStore, OrderHash, SwapConfig, SwapCoordinatorApi, SwapOutcome,
    };

    use crate::fixtures::World;

    async fn maker_writes(world: &World, store: &FileHandoffStore) -> OrderHash {
        let order = world.funded_order(1);
        let (signed, fill) = world.sign_and_fill(&order).await;
        let now = world.source.current_time().await.unwrap();
        let handoff = prepare_handoff(&world.config, signed, fill, generate_secret(), now).unwrap();
        store.save(&handoff).await.unwrap();
        handoff.order_hash
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolver_resumes_from_file() {
        let world = World::new(SwapConfig::for_testing());
        let dir = tempfile::tempdir().unwrap();
        let order_hash = maker_writes(&world, &FileHandoffStore::new(dir.path()).unwrap()).await;

        // Resolver side: fresh store handle, fresh coordinator.
        let store = FileHandoffStore::new(dir.path()).unwrap();
        let handoff = store.load(&order_hash).await.unwrap().unwrap();
        verify_order_signature(&handoff.signed_order, &world.resolver).unwrap();

        let coordinator = world.coordinator();
        let (swap, vault) = coordinator.resume_swap(&handoff).unwrap();
        assert_eq!(swap.order_hash, order_hash);
        let report = coordinator.run_swap(swap, vault).await.unwrap();
        assert_eq!(report.outcome, SwapOutcome::Completed);

        store.remove(&order_hash).await.unwrap();
        assert!(store.load(&order_hash).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_forged_signature_stops_resolver() {
        let world = World::new(SwapConfig::for_testing());
        let dir = tempfile::tempdir().unwrap();
        let store = FileHandoffStore::new(dir.path()).unwrap();
        let order_hash = maker_writes(&world, &store).await;

        let mut handoff = store.load(&order_hash).await.unwrap().unwrap();
        handoff.signed_order.signature.s[31] ^= 1;
        store.save(&handoff).await.unwrap();

        let loaded = store.load(&order_hash).await.unwrap().unwrap();
        assert!(verify_order_signature(&loaded.signed_order, &world.resolver).is_err());
        assert_eq!(world.source.submission_count(EscrowAction::Deploy), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handoff_with_foreign_timelocks_rejected() {
        let world = World::new(SwapConfig::for_testing());
        let dir = tempfile::tempdir().unwrap();
        let store = FileHandoffStore::new(dir.path()).unwrap();
        let order_hash = maker_writes(&world, &store).await;
        let handoff = store.load(&order_hash).await.unwrap().unwrap();

        let mut other = SwapConfig::for_testing();
        other.source_timelocks.withdrawal = 20;
        let resolver = swap_core::DualEscrowCoordinator::new(
            other,
            world.source.clone(),
            world.destination.clone(),
        )
        .unwrap();
        assert!(resolver.resume_swap(&handoff).is_err());
    }
}
