//! # Escrow State Machine
//!
//! One escrow per side. The ledger is the sole arbiter of state; this
//! type mirrors it for planning and validates every transition guard
//! before a transaction is submitted.
//!
//! ```text
//! Created ──deploy confirmed──→ Funded ──secret, ≥ withdrawal──→ Withdrawn
//!                                  └─────── ≥ cancellation ─────→ Cancelled
//! ```
//!
//! ## Guards
//!
//! | Transition | Time | Caller | Proof |
//! |------------|------|--------|-------|
//! | Created → Funded | deploy confirmed | depositor | locked value == immutables |
//! | Funded → Withdrawn | `[withdrawal, cancellation)` | taker | `sha256(secret) == hashlock` |
//! | Funded → Withdrawn | `[public_withdrawal, cancellation)` | anyone | same |
//! | Funded → Cancelled | `≥ cancellation` | taker | none |
//! | Funded → Cancelled | `≥ public_cancellation` | anyone | none |
//!
//! Script ledgers have no public windows and their withdrawal path
//! does not close when cancellation opens.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::errors::{Address, SwapError, Timestamp, ValidationError};
use super::immutables::{EscrowTerms, Immutables};
use super::secure_secret::Secret;
use super::timelocks::{AbsoluteTimelocks, TimelockOffsets};
use super::value_objects::{ChainId, EscrowRef, EscrowState, LedgerKind, Side, TxRef};

/// Transaction kinds an escrow accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EscrowAction {
    /// Create and fund.
    Deploy,
    /// Release to the beneficiary with the secret.
    Withdraw,
    /// Return to the depositor.
    Cancel,
}

impl std::fmt::Display for EscrowAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// A submitted, not yet settled transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTx {
    /// What was submitted.
    pub action: EscrowAction,
    /// Ledger reference.
    pub tx: TxRef,
    /// Chain time at submission.
    pub submitted_at: Timestamp,
}

/// Immutables frozen at creation plus the reference derived from them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    /// Exact parameters passed to every withdraw/cancel.
    pub immutables: Immutables,
    /// Derived escrow reference.
    pub escrow_ref: EscrowRef,
}

/// Whether a submission should go out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// Nothing pending, state allows it.
    Submit,
    /// Same action already pending and not yet due for resubmission.
    AlreadyPending(TxRef),
    /// The escrow already settled; submitting again would duplicate.
    AlreadySettled(EscrowState),
}

/// Proof that the destination escrow is confirmed funded with the
/// recorded immutables. Only [`Escrow::destination_funded`] builds one.
#[derive(Debug)]
pub struct DestinationFunded {
    escrow_ref: EscrowRef,
}

impl DestinationFunded {
    /// Funded destination escrow.
    pub fn escrow_ref(&self) -> EscrowRef {
        self.escrow_ref
    }
}

/// Local mirror of one on-chain escrow.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Escrow {
    /// Leg of the swap.
    pub side: Side,
    /// Ledger hosting it.
    pub chain: ChainId,
    /// Enforcement model of that ledger.
    pub kind: LedgerKind,
    /// Economic terms.
    pub terms: EscrowTerms,
    /// Relative timelocks, resolved at creation.
    pub offsets: TimelockOffsets,
    /// Set once creation time is known.
    pub deployment: Option<Deployment>,
    /// Last confirmed state.
    pub state: EscrowState,
    /// In-flight submission.
    pub pending: Option<PendingTx>,
    /// Chain time by which funding must be confirmed.
    pub funding_deadline: Option<Timestamp>,
    /// Set when the locked value disagrees with the immutables.
    pub funding_mismatch: Option<ValidationError>,
}

impl Escrow {
    /// New escrow in `Created`. Offsets and amount are validated here.
    pub fn new(
        side: Side,
        chain: ChainId,
        kind: LedgerKind,
        terms: EscrowTerms,
        offsets: TimelockOffsets,
    ) -> Result<Self, ValidationError> {
        offsets.validate(side)?;
        if terms.amount == 0 {
            return Err(ValidationError::ZeroAmount);
        }
        Ok(Self {
            side,
            chain,
            kind,
            terms,
            offsets,
            deployment: None,
            state: EscrowState::Created,
            pending: None,
            funding_deadline: None,
            funding_mismatch: None,
        })
    }

    /// Resolve timelocks against this escrow's own creation time.
    ///
    /// Runs once. Later calls return the recorded deployment unchanged.
    pub fn prepare_deployment(
        &mut self,
        creation_time: Timestamp,
    ) -> Result<&Deployment, ValidationError> {
        if self.deployment.is_none() {
            let timelocks = self.offsets.resolve(self.side, creation_time)?;
            let immutables = self.terms.with_timelocks(timelocks);
            immutables.validate()?;
            let escrow_ref = immutables.escrow_ref(self.chain, self.side);
            debug!(
                "[swap] {} escrow {} resolved at {} (cancellation {})",
                self.side, escrow_ref, creation_time, timelocks.cancellation
            );
            self.deployment = Some(Deployment {
                immutables,
                escrow_ref,
            });
        }
        self.deployment
            .as_ref()
            .ok_or_else(|| ValidationError::ImmutablesMismatch {
                side: self.side,
                field: "deployment".to_string(),
            })
    }

    /// Adopt immutables prepared by another process (see the handoff).
    ///
    /// Every term and every timelock offset must match this escrow.
    pub fn adopt_deployment(&mut self, immutables: Immutables) -> Result<(), ValidationError> {
        let mismatch = |field: &str| ValidationError::ImmutablesMismatch {
            side: self.side,
            field: field.to_string(),
        };
        let expected = self.terms.with_timelocks(immutables.timelocks);
        if expected != immutables {
            return Err(mismatch("terms"));
        }
        let resolved = self
            .offsets
            .resolve(self.side, immutables.timelocks.deployed_at)?;
        if resolved != immutables.timelocks {
            return Err(mismatch("timelocks"));
        }
        if let Some(existing) = &self.deployment {
            if existing.immutables != immutables {
                return Err(mismatch("deployment already recorded"));
            }
            return Ok(());
        }
        let escrow_ref = immutables.escrow_ref(self.chain, self.side);
        self.deployment = Some(Deployment {
            immutables,
            escrow_ref,
        });
        Ok(())
    }

    /// Escrow reference, once deployment is prepared.
    pub fn escrow_ref(&self) -> Option<EscrowRef> {
        self.deployment.as_ref().map(|d| d.escrow_ref)
    }

    /// Recorded immutables, once deployment is prepared.
    pub fn immutables(&self) -> Option<&Immutables> {
        self.deployment.as_ref().map(|d| &d.immutables)
    }

    /// Resolved absolute timelocks, once deployment is prepared.
    pub fn timelocks(&self) -> Option<&AbsoluteTimelocks> {
        self.immutables().map(|i| &i.timelocks)
    }

    /// Party funding the escrow: maker on the source, taker on the destination.
    pub fn depositor(&self) -> Address {
        match self.side {
            Side::Source => self.terms.maker,
            Side::Destination => self.terms.taker,
        }
    }

    /// Party paid on withdrawal: taker on the source, maker on the destination.
    pub fn beneficiary(&self) -> Address {
        match self.side {
            Side::Source => self.terms.taker,
            Side::Destination => self.terms.maker,
        }
    }

    /// Apply a confirmed state reported by the ledger.
    ///
    /// Forward moves are accepted even when they skip a state the
    /// watcher never saw. Backward moves and terminal flips are ignored
    /// and logged. Returns whether the recorded state changed.
    pub fn apply_confirmed(&mut self, observed: EscrowState) -> bool {
        if observed == self.state {
            return false;
        }
        if rank(observed) <= rank(self.state) {
            warn!(
                "[swap] {} escrow reported {} after {}, ignoring",
                self.side, observed, self.state
            );
            return false;
        }
        debug!("[swap] {} escrow {} -> {}", self.side, self.state, observed);
        self.state = observed;
        if self.pending.is_some() {
            self.pending = None;
        }
        true
    }

    /// Compare what the ledger locked with the recorded immutables.
    ///
    /// Asset, amount and safety deposit must all match. A mismatch is
    /// remembered; the coordinator refuses to progress past a
    /// mismatched escrow and moves to the cancellation path.
    pub fn verify_funding(
        &mut self,
        locked_asset: &Address,
        locked_amount: u128,
        safety_deposit: u128,
    ) -> Result<(), ValidationError> {
        let result = if *locked_asset != self.terms.asset {
            Err(ValidationError::LockedTermsMismatch {
                side: self.side,
                field: format!(
                    "asset 0x{} instead of 0x{}",
                    hex::encode(locked_asset),
                    hex::encode(self.terms.asset)
                ),
            })
        } else if locked_amount != self.terms.amount {
            Err(ValidationError::FundingMismatch {
                side: self.side,
                expected: self.terms.amount,
                locked: locked_amount,
            })
        } else if safety_deposit != self.terms.safety_deposit {
            Err(ValidationError::LockedTermsMismatch {
                side: self.side,
                field: format!(
                    "safety deposit {} instead of {}",
                    safety_deposit, self.terms.safety_deposit
                ),
            })
        } else {
            Ok(())
        };
        if let Err(err) = &result {
            self.funding_mismatch = Some(err.clone());
        }
        result
    }

    /// Confirmed funded with a verified amount.
    pub fn is_funded_verified(&self) -> bool {
        self.state == EscrowState::Funded && self.funding_mismatch.is_none()
    }

    /// Build the proof required before the secret may leave the vault.
    pub fn destination_funded(&self) -> Option<DestinationFunded> {
        if self.side != Side::Destination || !self.is_funded_verified() {
            return None;
        }
        self.escrow_ref()
            .map(|escrow_ref| DestinationFunded { escrow_ref })
    }

    /// Funding deadline passed without confirmation.
    pub fn is_funding_overdue(&self, now: Timestamp) -> bool {
        self.state == EscrowState::Created
            && self.funding_deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Created but can no longer become useful: never deployed, or its
    /// own cancellation time has passed.
    pub fn is_abandoned(&self, now: Timestamp) -> bool {
        self.state == EscrowState::Created
            && self
                .timelocks()
                .map_or(true, |t| now >= t.cancellation)
    }

    /// Record an outgoing submission.
    pub fn mark_pending(&mut self, action: EscrowAction, tx: TxRef, now: Timestamp) {
        self.pending = Some(PendingTx {
            action,
            tx,
            submitted_at: now,
        });
    }

    /// Drop the pending marker if it refers to `tx`.
    pub fn clear_pending(&mut self, tx: &TxRef) -> bool {
        if self.pending.is_some_and(|p| p.tx == *tx) {
            self.pending = None;
            return true;
        }
        false
    }

    /// Pending submission still awaiting confirmation.
    pub fn pending_within(&self, now: Timestamp, resubmit_after: u64) -> Option<PendingTx> {
        self.pending
            .filter(|p| now < p.submitted_at.saturating_add(resubmit_after))
    }

    /// Decide whether `action` should be submitted now.
    pub fn admit(&self, action: EscrowAction, now: Timestamp, resubmit_after: u64) -> Admission {
        let settled = match action {
            EscrowAction::Deploy => self.state != EscrowState::Created,
            EscrowAction::Withdraw | EscrowAction::Cancel => self.state.is_terminal(),
        };
        if settled {
            return Admission::AlreadySettled(self.state);
        }
        match self.pending_within(now, resubmit_after) {
            Some(p) if p.action == action => Admission::AlreadyPending(p.tx),
            _ => Admission::Submit,
        }
    }

    /// Withdrawal window open at `now` for `caller`.
    pub fn can_withdraw(&self, now: Timestamp, caller: &Address) -> bool {
        let Some(t) = self.timelocks() else {
            return false;
        };
        if now < t.withdrawal {
            return false;
        }
        if self.kind.withdrawal_closes_at_cancellation() && now >= t.cancellation {
            return false;
        }
        *caller == self.terms.taker
            || (self.kind.supports_public_windows() && now >= t.public_withdrawal)
    }

    /// Cancellation window open at `now` for `caller`.
    pub fn can_cancel(&self, now: Timestamp, caller: &Address) -> bool {
        let Some(t) = self.timelocks() else {
            return false;
        };
        if now < t.cancellation {
            return false;
        }
        *caller == self.terms.taker
            || (self.kind.supports_public_windows() && now >= t.public_cancellation)
    }

    /// Guard for `Funded → Withdrawn`.
    pub fn check_withdraw(
        &self,
        now: Timestamp,
        caller: &Address,
        secret: &Secret,
    ) -> Result<(), SwapError> {
        self.require_funded()?;
        let Some(immutables) = self.immutables() else {
            return Err(SwapError::EscrowNotFound(self.side.to_string()));
        };
        if !immutables.hash_lock.matches(secret) {
            return Err(SwapError::InvalidSecret);
        }
        let t = immutables.timelocks;
        if now < t.withdrawal
            || (self.kind.withdrawal_closes_at_cancellation() && now >= t.cancellation)
        {
            return Err(SwapError::WindowMissed {
                side: self.side,
                action: EscrowAction::Withdraw.to_string(),
                now,
            });
        }
        if !self.can_withdraw(now, caller) {
            return Err(SwapError::Unauthorized);
        }
        Ok(())
    }

    /// Guard for `Funded → Cancelled`.
    pub fn check_cancel(&self, now: Timestamp, caller: &Address) -> Result<(), SwapError> {
        self.require_funded()?;
        let Some(t) = self.timelocks() else {
            return Err(SwapError::EscrowNotFound(self.side.to_string()));
        };
        if now < t.cancellation {
            return Err(SwapError::WindowMissed {
                side: self.side,
                action: EscrowAction::Cancel.to_string(),
                now,
            });
        }
        if !self.can_cancel(now, caller) {
            return Err(SwapError::Unauthorized);
        }
        Ok(())
    }

    fn require_funded(&self) -> Result<(), SwapError> {
        if self.state != EscrowState::Funded {
            return Err(SwapError::StateConflict {
                side: self.side,
                expected: EscrowState::Funded.to_string(),
                found: self.state.to_string(),
            });
        }
        Ok(())
    }
}

fn rank(state: EscrowState) -> u8 {
    match state {
        EscrowState::Created => 0,
        EscrowState::Funded => 1,
        EscrowState::Withdrawn | EscrowState::Cancelled => 2,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::domain::order::OrderHash;
    use crate::domain::secure_secret::HashLock;

    pub const MAKER: Address = [0xA1; 20];
    pub const TAKER: Address = [0xC1; 20];
    pub const STRANGER: Address = [0xEE; 20];

    pub fn terms(hash_lock: HashLock) -> EscrowTerms {
        EscrowTerms {
            order_hash: OrderHash([7u8; 32]),
            hash_lock,
            maker: MAKER,
            taker: TAKER,
            asset: [0xB1; 20],
            amount: 1_000,
            safety_deposit: 10,
        }
    }

    pub fn funded_escrow(side: Side, kind: LedgerKind, secret: &Secret) -> Escrow {
        let mut escrow = Escrow::new(
            side,
            ChainId(1),
            kind,
            terms(HashLock::commit(secret)),
            TimelockOffsets::new(10, 60, 121, 181),
        )
        .unwrap();
        escrow.prepare_deployment(0).unwrap();
        escrow.apply_confirmed(EscrowState::Funded);
        escrow
    }
}
