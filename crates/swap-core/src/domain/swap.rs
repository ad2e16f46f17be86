//! # Swap Aggregate
//!
//! One order, one hashlock, two escrows. Owned by a single coordinator
//! task for its whole lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};
use uuid::Uuid;

use super::errors::{SwapError, ValidationError};
use super::escrow::Escrow;
use super::immutables::EscrowTerms;
use super::invariants::invariant_offsets_ordering;
use super::order::{FillResult, Order, OrderHash};
use super::secure_secret::HashLock;
use super::timelocks::TimelockOffsets;
use super::value_objects::{ChainId, EscrowState, LedgerKind, Side, SwapPhase};

/// Where one leg of the swap lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leg {
    /// Ledger.
    pub chain: ChainId,
    /// Enforcement model.
    pub kind: LedgerKind,
    /// Relative timelocks.
    pub offsets: TimelockOffsets,
}

/// Why the happy path was abandoned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbortReason {
    /// Source deploy never confirmed.
    SourceFundingTimeout,
    /// Source locked a different value than recorded.
    SourceFundingMismatch,
    /// Source cancellation reached before the destination could be created.
    SourceWindowLapsed,
    /// Destination deploy never confirmed.
    DestinationFundingTimeout,
    /// Destination locked a different value than recorded.
    DestinationFundingMismatch,
    /// Destination timelocks would outlive the source cancellation.
    DestinationTimelocksExceedSource(ValidationError),
    /// Both funded but the reveal conditions can no longer hold.
    RevealWindowLapsed,
    /// Secret released but the source withdrawal window closed.
    SourceWithdrawalMissed,
    /// Source withdrawn but the destination withdrawal window closed.
    DestinationWithdrawalMissed,
    /// An escrow was cancelled by another party.
    CancelledExternally(Side),
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DestinationTimelocksExceedSource(err) => {
                write!(f, "DestinationTimelocksExceedSource({})", err)
            }
            Self::CancelledExternally(side) => write!(f, "CancelledExternally({})", side),
            other => fmt::Debug::fmt(other, f),
        }
    }
}

/// Terminal classification of a swap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapOutcome {
    /// Both withdrawn.
    Completed,
    /// Every funded escrow cancelled.
    Refunded,
    /// Nothing was ever funded.
    Aborted,
    /// One side withdrawn, the other cancelled or stranded.
    Diverged,
}

impl SwapOutcome {
    /// Classify settled escrow states.
    pub fn classify(source: EscrowState, destination: EscrowState) -> Self {
        use EscrowState::*;
        match (source, destination) {
            (Withdrawn, Withdrawn) => Self::Completed,
            (Created, Created) => Self::Aborted,
            (Cancelled, Cancelled) | (Cancelled, Created) | (Created, Cancelled) => {
                Self::Refunded
            }
            _ => Self::Diverged,
        }
    }

    /// Terminal phase matching this outcome.
    pub fn phase(&self) -> SwapPhase {
        match self {
            Self::Completed => SwapPhase::Completed,
            Self::Refunded | Self::Diverged => SwapPhase::Refunded,
            Self::Aborted => SwapPhase::Aborted,
        }
    }
}

/// Summary returned when a swap settles.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapReport {
    /// Trace id for log correlation.
    pub trace_id: Uuid,
    /// Settled order.
    pub order_hash: OrderHash,
    /// Classification.
    pub outcome: SwapOutcome,
    /// Final source state.
    pub source: EscrowState,
    /// Final destination state.
    pub destination: EscrowState,
    /// Whether the secret left the vault.
    pub secret_revealed: bool,
    /// Why the happy path was abandoned, if it was.
    pub abort_reason: Option<AbortReason>,
}

/// The swap aggregate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Swap {
    /// Trace id attached to every log line of this swap.
    pub trace_id: Uuid,
    /// Signed terms.
    pub order: Order,
    /// Hash of `order`.
    pub order_hash: OrderHash,
    /// Matched fill.
    pub fill: FillResult,
    /// Commitment shared by both escrows.
    pub hash_lock: HashLock,
    /// Maker's escrow.
    pub source: Escrow,
    /// Resolver's escrow.
    pub destination: Escrow,
    /// Progress.
    pub phase: SwapPhase,
    /// Set once the happy path is abandoned.
    pub abort_reason: Option<AbortReason>,
}

impl Swap {
    /// Bind a filled order to a hashlock and two legs.
    ///
    /// Both escrows get the same order hash, hashlock and taker. The
    /// destination pays the maker's receiver the filled taking amount.
    pub fn open(
        order: Order,
        fill: FillResult,
        hash_lock: HashLock,
        source: Leg,
        destination: Leg,
    ) -> Result<Self, ValidationError> {
        order.validate()?;
        let order_hash = order.hash();
        if fill.order_hash != order_hash {
            return Err(ValidationError::InvalidOrder(
                "fill does not match order hash".to_string(),
            ));
        }
        if order.src_chain_id != source.chain || order.dst_chain_id != destination.chain {
            return Err(ValidationError::InvalidOrder(format!(
                "order chains {}/{} do not match legs {}/{}",
                order.src_chain_id, order.dst_chain_id, source.chain, destination.chain
            )));
        }
        invariant_offsets_ordering(&source.offsets, &destination.offsets)?;

        let source_terms = EscrowTerms {
            order_hash,
            hash_lock,
            maker: order.maker,
            taker: fill.resolver,
            asset: order.maker_asset,
            amount: fill.making_amount,
            safety_deposit: order.src_safety_deposit,
        };
        let destination_terms = EscrowTerms {
            order_hash,
            hash_lock,
            maker: order.receiver,
            taker: fill.resolver,
            asset: order.taker_asset,
            amount: fill.taking_amount,
            safety_deposit: order.dst_safety_deposit,
        };

        Ok(Self {
            trace_id: Uuid::new_v4(),
            source: Escrow::new(
                Side::Source,
                source.chain,
                source.kind,
                source_terms,
                source.offsets,
            )?,
            destination: Escrow::new(
                Side::Destination,
                destination.chain,
                destination.kind,
                destination_terms,
                destination.offsets,
            )?,
            order,
            order_hash,
            fill,
            hash_lock,
            phase: SwapPhase::Initiated,
            abort_reason: None,
        })
    }

    /// Escrow for a side.
    pub fn escrow(&self, side: Side) -> &Escrow {
        match side {
            Side::Source => &self.source,
            Side::Destination => &self.destination,
        }
    }

    /// Mutable escrow for a side.
    pub fn escrow_mut(&mut self, side: Side) -> &mut Escrow {
        match side {
            Side::Source => &mut self.source,
            Side::Destination => &mut self.destination,
        }
    }

    /// Happy path abandoned; only reclaiming remains.
    pub fn is_unwinding(&self) -> bool {
        self.abort_reason.is_some()
    }

    /// Transition to a new phase.
    pub fn transition_to(&mut self, next: SwapPhase) -> Result<(), SwapError> {
        if !self.phase.can_transition_to(next) {
            return Err(SwapError::InvalidPhaseTransition {
                from: format!("{:?}", self.phase),
                to: format!("{:?}", next),
            });
        }
        self.phase = next;
        Ok(())
    }

    /// Abandon the happy path. The first reason wins.
    pub fn abandon(&mut self, reason: AbortReason) {
        if self.abort_reason.is_some() || self.phase.is_terminal() {
            return;
        }
        warn!(
            trace_id = %self.trace_id,
            "[swap] Abandoning happy path in {:?}: {}", self.phase, reason
        );
        self.abort_reason = Some(reason);
        if self.phase != SwapPhase::Refunding {
            self.phase = SwapPhase::Refunding;
        }
    }

    /// Advance the phase to match confirmed escrow states.
    pub fn sync_phase(&mut self, secret_released: bool) {
        if self.is_unwinding() || self.phase.is_terminal() {
            return;
        }
        let steps = [
            (SwapPhase::SourceLocked, self.source.state != EscrowState::Created),
            (SwapPhase::BothLocked, self.destination.state != EscrowState::Created),
            (SwapPhase::SecretRevealed, secret_released),
        ];
        for (next, reached) in steps {
            if reached && self.phase.can_transition_to(next) {
                info!(trace_id = %self.trace_id, "[swap] {:?} -> {:?}", self.phase, next);
                self.phase = next;
            }
        }
    }

    /// Record the terminal outcome.
    pub fn finalize(&mut self, outcome: SwapOutcome) {
        self.phase = outcome.phase();
    }

    /// Build the report for the current escrow states.
    pub fn report(&self, outcome: SwapOutcome, secret_revealed: bool) -> SwapReport {
        SwapReport {
            trace_id: self.trace_id,
            order_hash: self.order_hash,
            outcome,
            source: self.source.state,
            destination: self.destination.state,
            secret_revealed,
            abort_reason: self.abort_reason.clone(),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::domain::order::test_support::sample_order;
    use crate::domain::secure_secret::Secret;

    pub const RESOLVER: [u8; 20] = [0xC1; 20];

    pub fn legs() -> (Leg, Leg) {
        (
            Leg {
                chain: ChainId(1),
                kind: LedgerKind::Contract,
                offsets: TimelockOffsets::new(10, 60, 121, 181),
            },
            Leg {
                chain: ChainId(2),
                kind: LedgerKind::Contract,
                offsets: TimelockOffsets::new(10, 50, 101, 150),
            },
        )
    }

    pub fn sample_swap(secret: &Secret) -> Swap {
        let order = sample_order();
        let fill = FillResult {
            order_hash: order.hash(),
            resolver: RESOLVER,
            making_amount: order.making_amount,
            taking_amount: order.taking_amount,
            nonce: order.nonce,
            filled_at: 0,
        };
        let (source, destination) = legs();
        Swap::open(order, fill, HashLock::commit(secret), source, destination).unwrap()
    }
}
