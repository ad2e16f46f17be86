//! # Swap Planner
//!
//! Pure decision function: given the swap and each chain's current time,
//! return the single next step. The coordinator executes the step,
//! waits for the next observation and asks again.
//!
//! ## Rules
//!
//! 1. The source withdrawal (which reveals the secret) is planned only
//!    once the destination is confirmed funded with verified value,
//!    the source window is open, and the destination still has
//!    `reveal_margin` before its cancellation opens.
//! 2. Withdrawal is preferred whenever the secret is out and the window
//!    is open. Cancellation is planned only once the happy path is
//!    abandoned or a withdrawal window closed.
//! 3. Destination actions are considered before source actions.
//! 4. Nothing is resubmitted while a submission for that escrow is
//!    pending and not yet due for resubmission.

use crate::domain::{
    invariant_absolute_ordering, AbortReason, EscrowAction, EscrowState, Side, Swap,
    SwapOutcome, Timestamp, TxRef,
};

/// Current time on each ledger.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Clocks {
    /// Source chain time.
    pub source: Timestamp,
    /// Destination chain time.
    pub destination: Timestamp,
}

impl Clocks {
    /// Time on the chain hosting `side`.
    pub fn get(&self, side: Side) -> Timestamp {
        match side {
            Side::Source => self.source,
            Side::Destination => self.destination,
        }
    }
}

/// Inputs that are not part of the aggregate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlanContext {
    /// Secret has left the vault.
    pub secret_released: bool,
    /// Minimum destination time left before cancellation when revealing.
    pub reveal_margin_secs: u64,
    /// Age after which a pending submission may be retried.
    pub resubmit_after_secs: u64,
}

/// A submission against one escrow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Action {
    /// Target escrow.
    pub side: Side,
    /// Transaction kind.
    pub kind: EscrowAction,
}

impl Action {
    fn new(side: Side, kind: EscrowAction) -> Self {
        Self { side, kind }
    }
}

/// What the coordinator is waiting on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitFor {
    /// A submitted transaction.
    Confirmation {
        /// Escrow
        side: Side,
        /// Pending transaction
        tx: TxRef,
    },
    /// Deployment confirmation.
    Funding {
        /// Escrow
        side: Side,
        /// Chain-time deadline
        deadline: Option<Timestamp>,
    },
    /// A timelock window.
    Window {
        /// Escrow
        side: Side,
        /// Chain time it opens
        opens_at: Timestamp,
    },
    /// Progress on the other chain.
    Counterpart,
}

/// Next step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Plan {
    /// Submit a transaction.
    Execute(Action),
    /// Leave the happy path; reclaim funded escrows.
    Abandon(AbortReason),
    /// Nothing to do until the next observation.
    Wait(WaitFor),
    /// Both escrows settled.
    Finish(SwapOutcome),
}

enum Step {
    Act(Plan),
    Wait(WaitFor),
    Idle,
}

/// Decide the next step.
pub fn plan(swap: &Swap, now: Clocks, ctx: &PlanContext) -> Plan {
    if let Some(outcome) = settled_outcome(swap, now) {
        return Plan::Finish(outcome);
    }
    if swap.source.state == EscrowState::Created {
        return plan_source_funding(swap, now.source, ctx);
    }
    if !swap.is_unwinding() {
        if let Some(reason) = happy_path_breach(swap) {
            return Plan::Abandon(reason);
        }
        if swap.destination.state == EscrowState::Created {
            return plan_destination_funding(swap, now, ctx);
        }
    }

    let mut first_wait = None;
    for side in [Side::Destination, Side::Source] {
        match plan_escrow(swap, side, now, ctx) {
            Step::Act(plan) => return plan,
            Step::Wait(wait) => {
                first_wait.get_or_insert(wait);
            }
            Step::Idle => {}
        }
    }
    Plan::Wait(first_wait.unwrap_or(WaitFor::Counterpart))
}

/// Outcome once neither escrow can change any more.
pub fn settled_outcome(swap: &Swap, now: Clocks) -> Option<SwapOutcome> {
    let src = &swap.source;
    let dst = &swap.destination;
    let unwinding = swap.is_unwinding();

    let src_done =
        src.state.is_terminal() || (unwinding && src.is_abandoned(now.source));
    let dst_done = dst.state.is_terminal()
        || ((unwinding || src.state.is_terminal()) && dst.is_abandoned(now.destination));

    (src_done && dst_done).then(|| SwapOutcome::classify(src.state, dst.state))
}

fn happy_path_breach(swap: &Swap) -> Option<AbortReason> {
    if swap.source.funding_mismatch.is_some() {
        return Some(AbortReason::SourceFundingMismatch);
    }
    if swap.destination.funding_mismatch.is_some() {
        return Some(AbortReason::DestinationFundingMismatch);
    }
    for side in [Side::Source, Side::Destination] {
        if swap.escrow(side).state == EscrowState::Cancelled {
            return Some(AbortReason::CancelledExternally(side));
        }
    }
    None
}

fn plan_source_funding(swap: &Swap, ts: Timestamp, ctx: &PlanContext) -> Plan {
    let src = &swap.source;
    let Some(timelocks) = src.timelocks() else {
        return Plan::Execute(Action::new(Side::Source, EscrowAction::Deploy));
    };
    if let Some(pending) = src.pending_within(ts, ctx.resubmit_after_secs) {
        return Plan::Wait(WaitFor::Confirmation {
            side: Side::Source,
            tx: pending.tx,
        });
    }
    if swap.is_unwinding() {
        // A late deploy could still land; watch until it no longer can.
        return Plan::Wait(WaitFor::Window {
            side: Side::Source,
            opens_at: timelocks.cancellation,
        });
    }
    if src.is_funding_overdue(ts) {
        return Plan::Abandon(AbortReason::SourceFundingTimeout);
    }
    // Reverted, or pending long enough to resubmit.
    Plan::Execute(Action::new(Side::Source, EscrowAction::Deploy))
}

fn plan_destination_funding(swap: &Swap, now: Clocks, ctx: &PlanContext) -> Plan {
    let src = &swap.source;
    let dst = &swap.destination;
    let Some(src_timelocks) = src.timelocks() else {
        return Plan::Wait(WaitFor::Counterpart);
    };
    if src.state != EscrowState::Funded {
        return Plan::Wait(WaitFor::Counterpart);
    }

    if dst.deployment.is_none() {
        if now.source >= src_timelocks.cancellation {
            return Plan::Abandon(AbortReason::SourceWindowLapsed);
        }
        let resolved = dst
            .offsets
            .resolve(Side::Destination, now.destination)
            .and_then(|dst_timelocks| invariant_absolute_ordering(src_timelocks, &dst_timelocks));
        if let Err(err) = resolved {
            return Plan::Abandon(AbortReason::DestinationTimelocksExceedSource(err));
        }
        return Plan::Execute(Action::new(Side::Destination, EscrowAction::Deploy));
    }

    if let Some(pending) = dst.pending_within(now.destination, ctx.resubmit_after_secs) {
        return Plan::Wait(WaitFor::Confirmation {
            side: Side::Destination,
            tx: pending.tx,
        });
    }
    if dst.is_funding_overdue(now.destination) {
        return Plan::Abandon(AbortReason::DestinationFundingTimeout);
    }
    Plan::Execute(Action::new(Side::Destination, EscrowAction::Deploy))
}

fn plan_escrow(swap: &Swap, side: Side, now: Clocks, ctx: &PlanContext) -> Step {
    let escrow = swap.escrow(side);
    if escrow.state != EscrowState::Funded {
        return Step::Idle;
    }
    if let Some(pending) = escrow.pending_within(now.get(side), ctx.resubmit_after_secs) {
        return Step::Wait(WaitFor::Confirmation {
            side,
            tx: pending.tx,
        });
    }
    match side {
        Side::Source => plan_source(swap, now, ctx),
        Side::Destination => plan_destination(swap, now, ctx),
    }
}

fn plan_source(swap: &Swap, now: Clocks, ctx: &PlanContext) -> Step {
    let src = &swap.source;
    let dst = &swap.destination;
    let taker = src.terms.taker;
    let Some(t) = src.timelocks() else {
        return Step::Idle;
    };

    if ctx.secret_released {
        if src.can_withdraw(now.source, &taker) {
            return Step::Act(Plan::Execute(Action::new(Side::Source, EscrowAction::Withdraw)));
        }
        if now.source < t.withdrawal {
            return Step::Wait(WaitFor::Window {
                side: Side::Source,
                opens_at: t.withdrawal,
            });
        }
        if !swap.is_unwinding() {
            return Step::Act(Plan::Abandon(AbortReason::SourceWithdrawalMissed));
        }
    } else if !swap.is_unwinding() {
        if !dst.is_funded_verified() {
            return Step::Idle;
        }
        if now.source < t.withdrawal {
            return Step::Wait(WaitFor::Window {
                side: Side::Source,
                opens_at: t.withdrawal,
            });
        }
        let Some(dst_t) = dst.timelocks() else {
            return Step::Idle;
        };
        let destination_margin_ok =
            now.destination.saturating_add(ctx.reveal_margin_secs) < dst_t.cancellation;
        if now.source >= t.cancellation || !destination_margin_ok {
            return Step::Act(Plan::Abandon(AbortReason::RevealWindowLapsed));
        }
        return Step::Act(Plan::Execute(Action::new(Side::Source, EscrowAction::Withdraw)));
    }

    if src.can_cancel(now.source, &taker) {
        return Step::Act(Plan::Execute(Action::new(Side::Source, EscrowAction::Cancel)));
    }
    Step::Wait(WaitFor::Window {
        side: Side::Source,
        opens_at: t.cancellation,
    })
}

fn plan_destination(swap: &Swap, now: Clocks, ctx: &PlanContext) -> Step {
    let src = &swap.source;
    let dst = &swap.destination;
    let taker = dst.terms.taker;
    let Some(t) = dst.timelocks() else {
        return Step::Idle;
    };

    if ctx.secret_released && src.state == EscrowState::Withdrawn {
        if dst.can_withdraw(now.destination, &taker) {
            return Step::Act(Plan::Execute(Action::new(
                Side::Destination,
                EscrowAction::Withdraw,
            )));
        }
        if now.destination < t.withdrawal {
            return Step::Wait(WaitFor::Window {
                side: Side::Destination,
                opens_at: t.withdrawal,
            });
        }
        if !swap.is_unwinding() {
            return Step::Act(Plan::Abandon(AbortReason::DestinationWithdrawalMissed));
        }
    } else if !swap.is_unwinding() {
        return Step::Idle;
    }

    if dst.can_cancel(now.destination, &taker) {
        return Step::Act(Plan::Execute(Action::new(
            Side::Destination,
            EscrowAction::Cancel,
        )));
    }
    Step::Wait(WaitFor::Window {
        side: Side::Destination,
        opens_at: t.cancellation,
    })
}
