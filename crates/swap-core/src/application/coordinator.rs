//! # Dual-Escrow Coordinator
//!
//! Drives one swap from the source deploy to a final state on both
//! ledgers.
//!
//! ```text
//!  source watcher ──┐
//!                   ├──mpsc──→ coordinator task ──plan()──→ submit via ChainAdapter
//!  dest. watcher  ──┘               │
//!                                   └──watch──→ escrow refs for the watchers
//! ```
//!
//! The coordinator task owns the swap and the secret vault. Watchers
//! only report; every decision is made by [`plan`] on the coordinator
//! task, so no two submissions against the same escrow can race.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use super::handoff::resume_handoff;
use super::retry::with_retry;
use super::watcher::{ChainWatcher, WatchUpdate};
use crate::algorithms::{plan, Action, Clocks, Plan, PlanContext};
use crate::config::SwapConfig;
use crate::domain::{
    invariant_absolute_ordering, invariant_atomic_outcome, Admission, EscrowAction, EscrowRef,
    EscrowState, FillResult, HashLock, Immutables, Order, OrderHash, SecretVault, Side, Swap,
    SwapError, SwapHandoff, SwapReport, Timestamp, Transaction, TxRef, ValidationError,
};
use crate::ports::inbound::SwapCoordinatorApi;
use crate::ports::outbound::{ChainAdapter, ChainEvent, ChainEventKind, EscrowStatus};

/// Capacity of the watcher → coordinator channel.
const WATCH_CHANNEL_CAPACITY: usize = 64;

/// Coordinator for swaps between one source and one destination ledger.
///
/// Several swaps may run concurrently on the same instance, each on its
/// own task. The only shared state is the hashlock registry: a hashlock
/// stays bound to the first order that used it, for the lifetime of the
/// coordinator, since its secret may already be public.
pub struct DualEscrowCoordinator {
    /// Configuration.
    config: SwapConfig,
    /// Source ledger.
    source: Arc<dyn ChainAdapter>,
    /// Destination ledger.
    destination: Arc<dyn ChainAdapter>,
    /// Order each hashlock is bound to.
    hash_locks: Mutex<HashMap<HashLock, OrderHash>>,
}

/// Per-swap state owned by the coordinator task.
struct SwapRun {
    swap: Swap,
    vault: SecretVault,
    clocks: Clocks,
    updates: mpsc::Receiver<WatchUpdate>,
    source_ref: watch::Sender<Option<EscrowRef>>,
    destination_ref: watch::Sender<Option<EscrowRef>>,
}

impl SwapRun {
    fn publish_ref(&self, side: Side) {
        let escrow_ref = self.swap.escrow(side).escrow_ref();
        match side {
            Side::Source => self.source_ref.send_replace(escrow_ref),
            Side::Destination => self.destination_ref.send_replace(escrow_ref),
        };
    }

    fn advance_clock(&mut self, side: Side, time: Timestamp) {
        let clock = match side {
            Side::Source => &mut self.clocks.source,
            Side::Destination => &mut self.clocks.destination,
        };
        *clock = (*clock).max(time);
    }
}

impl DualEscrowCoordinator {
    /// Create a coordinator. Adapters must serve the configured chains.
    pub fn new(
        config: SwapConfig,
        source: Arc<dyn ChainAdapter>,
        destination: Arc<dyn ChainAdapter>,
    ) -> Result<Self, SwapError> {
        config.validate()?;
        for (side, chain) in [(Side::Source, &source), (Side::Destination, &destination)] {
            let expected = config.chain(side);
            if chain.chain_id() != expected.chain_id || chain.kind() != expected.kind {
                return Err(ValidationError::InvalidConfig(format!(
                    "{} adapter serves {} ({:?}), configured {} ({:?})",
                    side,
                    chain.chain_id(),
                    chain.kind(),
                    expected.chain_id,
                    expected.kind
                ))
                .into());
            }
        }
        Ok(Self {
            config,
            source,
            destination,
            hash_locks: Mutex::new(HashMap::new()),
        })
    }

    /// Bind `hash_lock` to `order_hash`. Rebinding to the same order is
    /// allowed so a swap can be reopened or resumed.
    fn claim_hash_lock(&self, hash_lock: HashLock, order_hash: OrderHash) -> Result<(), SwapError> {
        match self.hash_locks.lock().entry(hash_lock) {
            Entry::Vacant(entry) => {
                entry.insert(order_hash);
                Ok(())
            }
            Entry::Occupied(entry) if *entry.get() == order_hash => Ok(()),
            Entry::Occupied(entry) => {
                warn!(
                    "[swap] Hashlock {} reused by order {} (bound to {})",
                    hash_lock,
                    order_hash,
                    entry.get()
                );
                Err(ValidationError::HashLockReused {
                    hash_lock: hash_lock.to_string(),
                    order: entry.get().to_string(),
                }
                .into())
            }
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &SwapConfig {
        &self.config
    }

    fn chain(&self, side: Side) -> &Arc<dyn ChainAdapter> {
        match side {
            Side::Source => &self.source,
            Side::Destination => &self.destination,
        }
    }

    fn plan_context(&self, run: &SwapRun) -> PlanContext {
        PlanContext {
            secret_released: run.vault.is_released(),
            reveal_margin_secs: self.config.reveal_margin_secs,
            resubmit_after_secs: self.config.resubmit_after_secs,
        }
    }

    async fn current_time(&self, side: Side) -> Result<Timestamp, SwapError> {
        let chain = Arc::clone(self.chain(side));
        with_retry(&self.config.retry, &format!("{} current_time", side), || {
            let chain = Arc::clone(&chain);
            async move { chain.current_time().await }
        })
        .await
    }

    async fn confirmed_state(
        &self,
        side: Side,
        escrow: EscrowRef,
    ) -> Result<Option<EscrowStatus>, SwapError> {
        let chain = Arc::clone(self.chain(side));
        with_retry(&self.config.retry, &format!("{} confirmed_state", side), || {
            let chain = Arc::clone(&chain);
            async move { chain.confirmed_state(&escrow).await }
        })
        .await
    }

    async fn submit(&self, side: Side, tx: Transaction) -> Result<TxRef, SwapError> {
        let chain = Arc::clone(self.chain(side));
        let what = format!("{} {} submit", side, tx.action());
        with_retry(&self.config.retry, &what, || {
            let chain = Arc::clone(&chain);
            let tx = tx.clone();
            async move { chain.submit(tx).await }
        })
        .await
    }

    async fn refresh_clocks(&self, run: &mut SwapRun) -> Result<(), SwapError> {
        for side in [Side::Source, Side::Destination] {
            let time = self.current_time(side).await?;
            run.advance_clock(side, time);
        }
        Ok(())
    }

    /// Main loop: plan, act, observe, until the planner reports both
    /// escrows settled.
    async fn drive(&self, run: &mut SwapRun) -> Result<SwapReport, SwapError> {
        let trace_id = run.swap.trace_id;
        self.refresh_clocks(run).await?;

        loop {
            let ctx = self.plan_context(run);
            match plan(&run.swap, run.clocks, &ctx) {
                Plan::Finish(outcome) => {
                    run.swap.finalize(outcome);
                    let report = run.swap.report(outcome, run.vault.is_released());
                    if !invariant_atomic_outcome(report.source, report.destination) {
                        error!(
                            trace_id = %trace_id,
                            "[swap] Non-atomic settlement: source {} destination {}",
                            report.source, report.destination
                        );
                    }
                    info!(
                        trace_id = %trace_id,
                        "[swap] Order {} settled {:?} (source {}, destination {})",
                        report.order_hash, outcome, report.source, report.destination
                    );
                    return Ok(report);
                }
                Plan::Abandon(reason) => run.swap.abandon(reason),
                Plan::Execute(action) => self.execute(run, action).await?,
                Plan::Wait(wait) => {
                    debug!(trace_id = %trace_id, "[swap] Waiting for {:?}", wait);
                    self.await_observation(run).await?;
                }
            }
        }
    }

    /// Submit one planned action.
    ///
    /// The confirmed state is re-read first; if the ledger already moved
    /// the escrow, nothing is submitted and the swap is replanned.
    async fn execute(&self, run: &mut SwapRun, action: Action) -> Result<(), SwapError> {
        let trace_id = run.swap.trace_id;
        let side = action.side;

        if let Some(escrow_ref) = run.swap.escrow(side).escrow_ref() {
            let status = self.confirmed_state(side, escrow_ref).await?;
            if self.apply_status(run, side, status) {
                return Ok(());
            }
        }

        let now = run.clocks.get(side);
        match run
            .swap
            .escrow(side)
            .admit(action.kind, now, self.config.resubmit_after_secs)
        {
            Admission::Submit => {}
            Admission::AlreadyPending(tx) => {
                debug!(trace_id = %trace_id, "[swap] {} {} already pending as {}", side, action.kind, tx);
                return self.await_observation(run).await;
            }
            Admission::AlreadySettled(state) => {
                debug!(trace_id = %trace_id, "[swap] {} escrow already {}, not submitting {}", side, state, action.kind);
                return Ok(());
            }
        }

        let tx = self.build_transaction(run, action)?;
        run.publish_ref(side);
        match self.submit(side, tx).await {
            Ok(tx_ref) => {
                run.swap.escrow_mut(side).mark_pending(action.kind, tx_ref, now);
                info!(
                    trace_id = %trace_id,
                    "[swap] Submitted {} on {} escrow {} as {}",
                    action.kind,
                    side,
                    run.swap
                        .escrow(side)
                        .escrow_ref()
                        .map(|r| r.to_string())
                        .unwrap_or_default(),
                    tx_ref
                );
                Ok(())
            }
            Err(err) if err.is_benign_race() => {
                warn!(trace_id = %trace_id, "[swap] {} {} lost a race: {}", side, action.kind, err);
                self.await_observation(run).await
            }
            Err(err) => {
                error!(trace_id = %trace_id, "[swap] {} {} failed: {}", side, action.kind, err);
                Err(err)
            }
        }
    }

    /// Typed transaction for a planned action, carrying the exact
    /// recorded immutables.
    fn build_transaction(&self, run: &mut SwapRun, action: Action) -> Result<Transaction, SwapError> {
        let side = action.side;
        let now = run.clocks.get(side);
        match action.kind {
            EscrowAction::Deploy => {
                let source_timelocks = run.swap.source.timelocks().copied();
                let funding_timeout = self.config.chain(side).funding_timeout_secs;
                let escrow = run.swap.escrow_mut(side);
                let immutables = escrow.prepare_deployment(now)?.immutables.clone();
                let source_cancellation = match side {
                    Side::Source => None,
                    Side::Destination => {
                        let source_timelocks = source_timelocks.ok_or_else(|| {
                            SwapError::EscrowNotFound(Side::Source.to_string())
                        })?;
                        invariant_absolute_ordering(&source_timelocks, &immutables.timelocks)?;
                        Some(source_timelocks.cancellation)
                    }
                };
                escrow
                    .funding_deadline
                    .get_or_insert(now.saturating_add(funding_timeout));
                Ok(Transaction::Deploy {
                    side,
                    immutables,
                    source_cancellation,
                })
            }
            EscrowAction::Withdraw => {
                let secret = match run.vault.revealed() {
                    Some(secret) => secret.clone(),
                    None => {
                        let proof = run.swap.destination.destination_funded().ok_or_else(|| {
                            SwapError::StateConflict {
                                side: Side::Destination,
                                expected: EscrowState::Funded.to_string(),
                                found: run.swap.destination.state.to_string(),
                            }
                        })?;
                        let secret = run.vault.release(proof).clone();
                        run.swap.sync_phase(true);
                        secret
                    }
                };
                let escrow = run.swap.escrow(side);
                let (escrow_ref, immutables) = recorded(run, side)?;
                Ok(Transaction::Withdraw {
                    side,
                    escrow: escrow_ref,
                    secret,
                    immutables,
                    caller: escrow.terms.taker,
                })
            }
            EscrowAction::Cancel => {
                let (escrow_ref, immutables) = recorded(run, side)?;
                Ok(Transaction::Cancel {
                    side,
                    escrow: escrow_ref,
                    immutables,
                    caller: run.swap.escrow(side).terms.taker,
                })
            }
        }
    }

    /// Wait for the next watcher update, bounded by the observation timeout.
    async fn await_observation(&self, run: &mut SwapRun) -> Result<(), SwapError> {
        let timeout = self.config.observation_timeout();
        match tokio::time::timeout(timeout, run.updates.recv()).await {
            Err(_) => {
                warn!(
                    trace_id = %run.swap.trace_id,
                    "[swap] No observation within {:?}, refreshing chain time", timeout
                );
                self.refresh_clocks(run).await
            }
            Ok(None) => Err(SwapError::Shutdown("chain watchers stopped".to_string())),
            Ok(Some(update)) => {
                self.apply_update(run, update);
                while let Ok(update) = run.updates.try_recv() {
                    self.apply_update(run, update);
                }
                Ok(())
            }
        }
    }

    fn apply_update(&self, run: &mut SwapRun, update: WatchUpdate) {
        match update {
            WatchUpdate::Unavailable { side, reason } => {
                warn!(trace_id = %run.swap.trace_id, "[swap] {} ledger unavailable: {}", side, reason);
            }
            WatchUpdate::Observed(observation) => {
                let side = observation.side;
                run.advance_clock(side, observation.time);
                for event in &observation.events {
                    self.apply_event(run, side, event);
                }
                self.apply_status(run, side, observation.status);
            }
        }
    }

    fn apply_event(&self, run: &mut SwapRun, side: Side, event: &ChainEvent) {
        let trace_id = run.swap.trace_id;
        match &event.kind {
            ChainEventKind::Withdrawn { secret } => {
                let already = run.vault.is_released();
                match run.vault.accept_public(secret) {
                    Ok(()) if !already => {
                        info!(trace_id = %trace_id, "[swap] Secret observed in {} withdrawal {}", side, event.tx);
                    }
                    Ok(()) => {}
                    Err(err) => {
                        warn!(trace_id = %trace_id, "[swap] {} withdrawal {} carried a foreign secret: {}", side, event.tx, err);
                    }
                }
            }
            ChainEventKind::Reverted { action, reason } => {
                if run.swap.escrow_mut(side).clear_pending(&event.tx) {
                    warn!(trace_id = %trace_id, "[swap] {} {} reverted ({}): {}", side, action, event.tx, reason);
                }
            }
            ChainEventKind::Deployed | ChainEventKind::Cancelled => {
                debug!(trace_id = %trace_id, "[swap] {} event {:?} in {}", side, event.kind, event.tx);
            }
        }
    }

    /// Fold a confirmed status into the swap. Returns whether the escrow
    /// state changed.
    fn apply_status(&self, run: &mut SwapRun, side: Side, status: Option<EscrowStatus>) -> bool {
        let Some(status) = status else {
            return false;
        };
        let trace_id = run.swap.trace_id;
        let escrow = run.swap.escrow_mut(side);
        let was_created = escrow.state == EscrowState::Created;
        if !escrow.apply_confirmed(status.state) {
            return false;
        }
        if was_created {
            match escrow.verify_funding(
                &status.locked_asset,
                status.locked_amount,
                status.safety_deposit,
            ) {
                Ok(()) => info!(
                    trace_id = %trace_id,
                    "[swap] {} escrow funded with {}", side, status.locked_amount
                ),
                Err(err) => error!(trace_id = %trace_id, "[swap] {}", err),
            }
        }
        let released = run.vault.is_released();
        run.swap.sync_phase(released);
        true
    }
}

/// Escrow reference and immutables recorded for `side`.
fn recorded(run: &SwapRun, side: Side) -> Result<(EscrowRef, Immutables), SwapError> {
    let deployment = run
        .swap
        .escrow(side)
        .deployment
        .as_ref()
        .ok_or_else(|| SwapError::EscrowNotFound(side.to_string()))?;
    Ok((deployment.escrow_ref, deployment.immutables.clone()))
}

#[async_trait]
impl SwapCoordinatorApi for DualEscrowCoordinator {
    fn open_swap(
        &self,
        order: &Order,
        fill: FillResult,
        hash_lock: HashLock,
    ) -> Result<Swap, SwapError> {
        let swap = Swap::open(
            order.clone(),
            fill,
            hash_lock,
            self.config.source_leg(),
            self.config.destination_leg(),
        )?;
        self.claim_hash_lock(swap.hash_lock, swap.order_hash)?;
        info!(
            trace_id = %swap.trace_id,
            "[swap] Opened swap for order {} ({} on {} -> {} on {})",
            swap.order_hash,
            fill.making_amount,
            self.config.source.chain_id,
            fill.taking_amount,
            self.config.destination.chain_id
        );
        Ok(swap)
    }

    fn resume_swap(&self, handoff: &SwapHandoff) -> Result<(Swap, SecretVault), SwapError> {
        let (swap, vault) = resume_handoff(&self.config, handoff)?;
        self.claim_hash_lock(swap.hash_lock, swap.order_hash)?;
        info!(trace_id = %swap.trace_id, "[swap] Resumed swap for order {}", swap.order_hash);
        Ok((swap, vault))
    }

    async fn run_swap(&self, swap: Swap, vault: SecretVault) -> Result<SwapReport, SwapError> {
        if vault.hash_lock() != swap.hash_lock {
            return Err(ValidationError::ImmutablesMismatch {
                side: Side::Source,
                field: "hash_lock".to_string(),
            }
            .into());
        }
        self.claim_hash_lock(swap.hash_lock, swap.order_hash)?;

        let (updates_tx, updates) = mpsc::channel(WATCH_CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (source_ref, source_ref_rx) = watch::channel(swap.source.escrow_ref());
        let (destination_ref, destination_ref_rx) = watch::channel(swap.destination.escrow_ref());

        let watchers = [
            ChainWatcher::new(
                Side::Source,
                Arc::clone(&self.source),
                source_ref_rx,
                updates_tx.clone(),
                shutdown_rx.clone(),
                self.config.poll_interval(),
            )
            .spawn(),
            ChainWatcher::new(
                Side::Destination,
                Arc::clone(&self.destination),
                destination_ref_rx,
                updates_tx,
                shutdown_rx,
                self.config.poll_interval(),
            )
            .spawn(),
        ];

        let mut run = SwapRun {
            swap,
            vault,
            clocks: Clocks::default(),
            updates,
            source_ref,
            destination_ref,
        };
        info!(trace_id = %run.swap.trace_id, "[swap] Driving order {}", run.swap.order_hash);
        let result = self.drive(&mut run).await;

        let _ = shutdown_tx.send(true);
        drop(run);
        for handle in watchers {
            if let Err(err) = handle.await {
                warn!("[swap] Chain watcher ended abnormally: {}", err);
            }
        }
        result
    }
}
