//! # Fault Scenarios
//!
//! Ledger outages, underfunded escrows, late confirmations and a
//! resolver restarting after the source deploy already landed.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use swap_core::{
        generate_secret, prepare_handoff, AbortReason, ChainAdapter, EscrowAction, EscrowState,
        OrderSigner, SwapConfig, SwapCoordinatorApi, SwapError, SwapOutcome,
    };

    use crate::fixtures::{script_destination, World, MAKER_ASSET, MAKING_AMOUNT};

    #[tokio::test(start_paused = true)]
    async fn test_destination_outage_is_ridden_out() {
        let mut config = SwapConfig::for_testing();
        config.retry.max_attempts = None;
        let world = World::new(config);
        let coordinator = world.coordinator();
        let (swap, vault) = world.open(&coordinator, 1).await;

        // Offline across the destination withdrawal.
        let destination = world.destination.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(9)).await;
            destination.set_online(false);
            tokio::time::sleep(Duration::from_secs(5)).await;
            destination.set_online(true);
        });

        let report = coordinator.run_swap(swap, vault).await.unwrap();
        assert_eq!(report.outcome, SwapOutcome::Completed);
        assert_eq!(
            world.destination.submission_count(EscrowAction::Withdraw),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_retries_surface_outage() {
        let world = World::new(SwapConfig::for_testing());
        let coordinator = world.coordinator();
        let (swap, vault) = world.open(&coordinator, 1).await;
        world.destination.set_online(false);

        let err = coordinator.run_swap(swap, vault).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(err, SwapError::ChainUnavailable { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_underfunded_destination_never_sees_secret() {
        let world = World::new(script_destination());
        world.destination.set_lock_shortfall(1);
        let coordinator = world.coordinator();
        let (swap, vault) = world.open(&coordinator, 1).await;

        let report = coordinator.run_swap(swap, vault).await.unwrap();
        assert_eq!(report.outcome, SwapOutcome::Refunded);
        assert_eq!(report.source, EscrowState::Cancelled);
        assert_eq!(report.destination, EscrowState::Cancelled);
        assert!(!report.secret_revealed);
        assert_eq!(
            report.abort_reason,
            Some(AbortReason::DestinationFundingMismatch)
        );
        assert_eq!(world.source.submission_count(EscrowAction::Withdraw), 0);
        assert_eq!(
            world.source.balance(&world.maker.address(), &MAKER_ASSET),
            MAKING_AMOUNT
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_source_confirmation_is_cancelled() {
        let world = World::new(SwapConfig::for_testing());
        // Confirms after the 30 s funding timeout.
        world.source.set_confirmation_delay(40);
        let coordinator = world.coordinator();
        let (swap, vault) = world.open(&coordinator, 1).await;

        let report = coordinator.run_swap(swap, vault).await.unwrap();
        assert_eq!(report.outcome, SwapOutcome::Refunded);
        assert_eq!(report.source, EscrowState::Cancelled);
        assert_eq!(report.destination, EscrowState::Created);
        assert_eq!(report.abort_reason, Some(AbortReason::SourceFundingTimeout));
        assert_eq!(world.destination.submission_count(EscrowAction::Deploy), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_source_deploy_does_not_redeploy() {
        let world = World::new(SwapConfig::for_testing());
        let order = world.funded_order(1);
        let (signed, fill) = world.sign_and_fill(&order).await;
        let handoff =
            prepare_handoff(&world.config, signed, fill, generate_secret(), 0).unwrap();

        // A previous resolver run got the deploy confirmed, then stopped.
        world
            .source
            .submit(handoff.resolver_txn_data.clone())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;

        let coordinator = world.coordinator();
        let (swap, vault) = coordinator.resume_swap(&handoff).unwrap();
        let report = coordinator.run_swap(swap, vault).await.unwrap();

        assert_eq!(report.outcome, SwapOutcome::Completed);
        assert_eq!(world.source.submission_count(EscrowAction::Deploy), 1);
    }
}
