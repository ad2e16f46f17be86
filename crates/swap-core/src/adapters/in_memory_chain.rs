//! In-Memory Ledger Adapter
//!
//! Implements `ChainAdapter` for a simulated ledger hosting escrows.
//! Used by tests and by the runtime demo.
//!
//! Submitted transactions sit in a mempool until `confirmation_delay`
//! chain seconds have passed, then execute against the escrow rules at
//! their confirmation time. Rejections surface as `Reverted` events,
//! except a withdraw or cancel aimed at an escrow that already settled:
//! submission preflight refuses that one with `StateConflict`.
//!
//! Chain time follows the tokio clock, so paused-time tests advance it
//! deterministically.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::domain::{
    keccak256, Address, ChainId, EscrowAction, EscrowRef, EscrowState, Immutables, LedgerKind,
    Secret, Side, SwapError, Timestamp, Transaction, TxRef,
};
use crate::ports::outbound::{ChainAdapter, ChainEvent, ChainEventKind, EscrowStatus, EventFilter};

/// Asset id used for safety deposits.
pub const NATIVE_ASSET: Address = [0u8; 20];

/// How far a deploy's creation time may lag its confirmation.
pub const MAX_DEPLOY_DRIFT_SECS: u64 = 300;

/// Default chain time at adapter creation.
const DEFAULT_GENESIS: Timestamp = 1_700_000_000;

/// Escrow as stored by the ledger.
#[derive(Clone, Debug)]
struct EscrowRecord {
    side: Side,
    immutables: Immutables,
    state: EscrowState,
    locked_amount: u128,
}

impl EscrowRecord {
    fn depositor(&self) -> Address {
        match self.side {
            Side::Source => self.immutables.maker,
            Side::Destination => self.immutables.taker,
        }
    }

    fn beneficiary(&self) -> Address {
        match self.side {
            Side::Source => self.immutables.taker,
            Side::Destination => self.immutables.maker,
        }
    }
}

#[derive(Clone, Debug)]
struct MempoolTx {
    tx: TxRef,
    transaction: Transaction,
    confirm_at: Timestamp,
}

#[derive(Debug, Default)]
struct LedgerState {
    time_offset: u64,
    confirmation_delay: u64,
    online: bool,
    stall_deploys: bool,
    lock_shortfall: u128,
    escrows: HashMap<EscrowRef, EscrowRecord>,
    mempool: Vec<MempoolTx>,
    events: Vec<ChainEvent>,
    balances: HashMap<(Address, Address), u128>,
    submitted: Vec<Transaction>,
    tx_counter: u64,
}

/// Simulated ledger.
pub struct InMemoryChain {
    chain_id: ChainId,
    kind: LedgerKind,
    genesis: Timestamp,
    started: Instant,
    state: RwLock<LedgerState>,
}

impl InMemoryChain {
    /// Create a ledger with one second of confirmation delay.
    pub fn new(chain_id: ChainId, kind: LedgerKind) -> Self {
        Self::with_genesis(chain_id, kind, DEFAULT_GENESIS)
    }

    /// Create a ledger whose clock starts at `genesis`.
    pub fn with_genesis(chain_id: ChainId, kind: LedgerKind, genesis: Timestamp) -> Self {
        Self {
            chain_id,
            kind,
            genesis,
            started: Instant::now(),
            state: RwLock::new(LedgerState {
                online: true,
                confirmation_delay: 1,
                ..LedgerState::default()
            }),
        }
    }

    /// Seconds between submission and confirmation.
    pub fn set_confirmation_delay(&self, secs: u64) {
        self.state.write().confirmation_delay = secs;
    }

    /// Take the ledger offline; every call fails with `ChainUnavailable`.
    pub fn set_online(&self, online: bool) {
        info!("[swap] {} {}", self.chain_id, if online { "online" } else { "offline" });
        self.state.write().online = online;
    }

    /// Keep deploys in the mempool indefinitely.
    pub fn stall_deploys(&self, stall: bool) {
        self.state.write().stall_deploys = stall;
    }

    /// Lock this much less than the immutables amount on deploy.
    pub fn set_lock_shortfall(&self, shortfall: u128) {
        self.state.write().lock_shortfall = shortfall;
    }

    /// Jump chain time forward.
    pub fn advance(&self, secs: u64) {
        let mut state = self.state.write();
        state.time_offset = state.time_offset.saturating_add(secs);
    }

    /// Mint `amount` of `asset` to `owner`.
    pub fn credit(&self, owner: Address, asset: Address, amount: u128) {
        let mut state = self.state.write();
        let balance = state.balances.entry((owner, asset)).or_default();
        *balance = balance.saturating_add(amount);
    }

    /// Balance of `owner` in `asset`.
    pub fn balance(&self, owner: &Address, asset: &Address) -> u128 {
        self.state
            .read()
            .balances
            .get(&(*owner, *asset))
            .copied()
            .unwrap_or(0)
    }

    /// Every transaction ever accepted into the mempool, in order.
    pub fn submitted(&self) -> Vec<Transaction> {
        self.state.read().submitted.clone()
    }

    /// Number of accepted submissions of `action`.
    pub fn submission_count(&self, action: EscrowAction) -> usize {
        self.state
            .read()
            .submitted
            .iter()
            .filter(|tx| tx.action() == action)
            .count()
    }

    fn now(&self, state: &LedgerState) -> Timestamp {
        self.genesis
            .saturating_add(self.started.elapsed().as_secs())
            .saturating_add(state.time_offset)
    }

    fn ensure_online(&self, state: &LedgerState) -> Result<(), SwapError> {
        if state.online {
            return Ok(());
        }
        Err(SwapError::ChainUnavailable {
            chain: self.chain_id,
            reason: "ledger offline".to_string(),
        })
    }

    /// Withdraw and cancel need a funded escrow. Unknown escrows pass and
    /// revert at confirmation if still missing.
    fn preflight(&self, state: &LedgerState, transaction: &Transaction) -> Result<(), SwapError> {
        if transaction.action() == EscrowAction::Deploy {
            return Ok(());
        }
        match state.escrows.get(&self.target(transaction)) {
            Some(record) if record.state.is_terminal() => Err(SwapError::StateConflict {
                side: transaction.side(),
                expected: EscrowState::Funded.to_string(),
                found: record.state.to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Confirm every mempool transaction that is due, in confirmation order.
    fn settle(&self, state: &mut LedgerState) {
        let now = self.now(state);
        let stall = state.stall_deploys;
        let mut due = Vec::new();
        state.mempool.retain(|entry| {
            let stalled = stall && entry.transaction.action() == EscrowAction::Deploy;
            if entry.confirm_at <= now && !stalled {
                due.push(entry.clone());
                false
            } else {
                true
            }
        });
        due.sort_by_key(|entry| entry.confirm_at);

        for entry in due {
            let escrow = self.target(&entry.transaction);
            let kind = match self.execute(state, &entry.transaction, entry.confirm_at) {
                Ok(kind) => kind,
                Err(reason) => {
                    warn!(
                        "[swap] {} reverted {} {}: {}",
                        self.chain_id,
                        entry.transaction.action(),
                        entry.tx,
                        reason
                    );
                    ChainEventKind::Reverted {
                        action: entry.transaction.action(),
                        reason,
                    }
                }
            };
            let index = state.events.len() as u64;
            state.events.push(ChainEvent {
                index,
                tx: entry.tx,
                escrow,
                kind,
            });
        }
    }

    fn target(&self, transaction: &Transaction) -> EscrowRef {
        match transaction {
            Transaction::Deploy {
                side, immutables, ..
            } => immutables.escrow_ref(self.chain_id, *side),
            Transaction::Withdraw { escrow, .. } | Transaction::Cancel { escrow, .. } => *escrow,
        }
    }

    fn execute(
        &self,
        state: &mut LedgerState,
        transaction: &Transaction,
        at: Timestamp,
    ) -> Result<ChainEventKind, String> {
        match transaction {
            Transaction::Deploy {
                side,
                immutables,
                source_cancellation,
            } => self.deploy(state, *side, immutables, *source_cancellation, at),
            Transaction::Withdraw {
                escrow,
                secret,
                immutables,
                caller,
                ..
            } => self.withdraw(state, escrow, secret, immutables, caller, at),
            Transaction::Cancel {
                escrow,
                immutables,
                caller,
                ..
            } => self.cancel(state, escrow, immutables, caller, at),
        }
    }

    fn deploy(
        &self,
        state: &mut LedgerState,
        side: Side,
        immutables: &Immutables,
        source_cancellation: Option<Timestamp>,
        at: Timestamp,
    ) -> Result<ChainEventKind, String> {
        immutables.validate().map_err(|e| e.to_string())?;
        let escrow = immutables.escrow_ref(self.chain_id, side);
        if state.escrows.contains_key(&escrow) {
            return Err("escrow already deployed".to_string());
        }
        let t = &immutables.timelocks;
        if t.deployed_at > at || at - t.deployed_at > MAX_DEPLOY_DRIFT_SECS {
            return Err(format!("creation time {} too far from {}", t.deployed_at, at));
        }
        if at >= t.cancellation {
            return Err("cancellation already open".to_string());
        }
        if side == Side::Destination {
            match source_cancellation {
                Some(src) if t.cancellation <= src => {}
                Some(src) => {
                    return Err(format!(
                        "destination cancellation {} after source cancellation {}",
                        t.cancellation, src
                    ))
                }
                None => return Err("source cancellation required".to_string()),
            }
        }

        let record = EscrowRecord {
            side,
            immutables: immutables.clone(),
            state: EscrowState::Funded,
            locked_amount: immutables.amount.saturating_sub(state.lock_shortfall),
        };
        debit(state, record.depositor(), immutables.asset, immutables.amount)?;
        if let Err(reason) = debit(state, immutables.taker, NATIVE_ASSET, immutables.safety_deposit)
        {
            credit(state, record.depositor(), immutables.asset, immutables.amount);
            return Err(reason);
        }
        info!(
            "[swap] {} escrow {} deployed on {} ({} locked)",
            side, escrow, self.chain_id, record.locked_amount
        );
        state.escrows.insert(escrow, record);
        Ok(ChainEventKind::Deployed)
    }

    fn withdraw(
        &self,
        state: &mut LedgerState,
        escrow: &EscrowRef,
        secret: &Secret,
        immutables: &Immutables,
        caller: &Address,
        at: Timestamp,
    ) -> Result<ChainEventKind, String> {
        let kind = self.kind;
        let record = self.funded_record(state, escrow, immutables)?;
        if !record.immutables.hash_lock.matches(secret) {
            return Err("invalid secret".to_string());
        }
        let t = record.immutables.timelocks;
        if at < t.withdrawal {
            return Err("withdrawal not open".to_string());
        }
        if kind.withdrawal_closes_at_cancellation() && at >= t.cancellation {
            return Err("withdrawal closed".to_string());
        }
        let public = kind.supports_public_windows() && at >= t.public_withdrawal;
        if *caller != record.immutables.taker && !public {
            return Err("caller not allowed to withdraw".to_string());
        }

        record.state = EscrowState::Withdrawn;
        let (beneficiary, asset, amount, deposit) = (
            record.beneficiary(),
            record.immutables.asset,
            record.locked_amount,
            record.immutables.safety_deposit,
        );
        credit(state, beneficiary, asset, amount);
        credit(state, *caller, NATIVE_ASSET, deposit);
        debug!("[swap] {} escrow {} withdrawn", self.chain_id, escrow);
        Ok(ChainEventKind::Withdrawn {
            secret: secret.clone(),
        })
    }

    fn cancel(
        &self,
        state: &mut LedgerState,
        escrow: &EscrowRef,
        immutables: &Immutables,
        caller: &Address,
        at: Timestamp,
    ) -> Result<ChainEventKind, String> {
        let kind = self.kind;
        let record = self.funded_record(state, escrow, immutables)?;
        let t = record.immutables.timelocks;
        if at < t.cancellation {
            return Err("cancellation not open".to_string());
        }
        let public = kind.supports_public_windows() && at >= t.public_cancellation;
        if *caller != record.immutables.taker && !public {
            return Err("caller not allowed to cancel".to_string());
        }

        record.state = EscrowState::Cancelled;
        let (depositor, asset, amount, deposit) = (
            record.depositor(),
            record.immutables.asset,
            record.locked_amount,
            record.immutables.safety_deposit,
        );
        credit(state, depositor, asset, amount);
        credit(state, *caller, NATIVE_ASSET, deposit);
        debug!("[swap] {} escrow {} cancelled", self.chain_id, escrow);
        Ok(ChainEventKind::Cancelled)
    }

    fn funded_record<'a>(
        &self,
        state: &'a mut LedgerState,
        escrow: &EscrowRef,
        immutables: &Immutables,
    ) -> Result<&'a mut EscrowRecord, String> {
        let record = state
            .escrows
            .get_mut(escrow)
            .ok_or_else(|| "escrow not found".to_string())?;
        if immutables.escrow_ref(self.chain_id, record.side) != *escrow {
            return Err("immutables do not derive the escrow".to_string());
        }
        if record.state != EscrowState::Funded {
            return Err(format!("escrow already {}", record.state));
        }
        Ok(record)
    }
}

fn debit(
    state: &mut LedgerState,
    owner: Address,
    asset: Address,
    amount: u128,
) -> Result<(), String> {
    let balance = state.balances.entry((owner, asset)).or_default();
    if *balance < amount {
        return Err(format!(
            "insufficient balance: 0x{} holds {}, needs {}",
            hex::encode(owner),
            balance,
            amount
        ));
    }
    *balance -= amount;
    Ok(())
}

fn credit(state: &mut LedgerState, owner: Address, asset: Address, amount: u128) {
    let balance = state.balances.entry((owner, asset)).or_default();
    *balance = balance.saturating_add(amount);
}

#[async_trait]
impl ChainAdapter for InMemoryChain {
    fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    fn kind(&self) -> LedgerKind {
        self.kind
    }

    async fn submit(&self, transaction: Transaction) -> Result<TxRef, SwapError> {
        let mut state = self.state.write();
        self.ensure_online(&state)?;
        self.settle(&mut state);
        self.preflight(&state, &transaction)?;

        state.tx_counter += 1;
        let mut bytes = Vec::with_capacity(17);
        bytes.extend_from_slice(&self.chain_id.0.to_be_bytes());
        bytes.extend_from_slice(&state.tx_counter.to_be_bytes());
        bytes.push(transaction.action() as u8);
        let tx = TxRef(keccak256(&bytes));

        let confirm_at = self.now(&state).saturating_add(state.confirmation_delay);
        debug!(
            "[swap] {} accepted {} {} (confirms at {})",
            self.chain_id,
            transaction.action(),
            tx,
            confirm_at
        );
        state.submitted.push(transaction.clone());
        state.mempool.push(MempoolTx {
            tx,
            transaction,
            confirm_at,
        });
        Ok(tx)
    }

    async fn confirmed_state(&self, escrow: &EscrowRef) -> Result<Option<EscrowStatus>, SwapError> {
        let mut state = self.state.write();
        self.ensure_online(&state)?;
        self.settle(&mut state);
        Ok(state.escrows.get(escrow).map(|record| EscrowStatus {
            state: record.state,
            locked_amount: record.locked_amount,
            locked_asset: record.immutables.asset,
            safety_deposit: record.immutables.safety_deposit,
        }))
    }

    async fn current_time(&self) -> Result<Timestamp, SwapError> {
        let mut state = self.state.write();
        self.ensure_online(&state)?;
        self.settle(&mut state);
        Ok(self.now(&state))
    }

    async fn watch_events(&self, filter: &EventFilter) -> Result<Vec<ChainEvent>, SwapError> {
        let mut state = self.state.write();
        self.ensure_online(&state)?;
        self.settle(&mut state);
        Ok(state
            .events
            .iter()
            .skip(filter.from_index as usize)
            .filter(|event| event.escrow == filter.escrow)
            .cloned()
            .collect())
    }
}
