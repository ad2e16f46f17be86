//! # Domain Invariants
//!
//! Cross-escrow rules checked before anything is submitted.

use super::errors::ValidationError;
use super::immutables::Immutables;
use super::timelocks::{AbsoluteTimelocks, TimelockOffsets};
use super::value_objects::{EscrowState, Side};

/// Invariant: timelock ordering.
///
/// Each side strictly increasing, and the destination cancellation must
/// open no later than the source cancellation so the resolver can always
/// reclaim the destination before losing the ability to cancel the source.
pub fn invariant_offsets_ordering(
    source: &TimelockOffsets,
    destination: &TimelockOffsets,
) -> Result<(), ValidationError> {
    source.validate(Side::Source)?;
    destination.validate(Side::Destination)?;
    if destination.cancellation > source.cancellation {
        return Err(ValidationError::CrossChainTimelock {
            source_cancellation: source.cancellation,
            destination: destination.cancellation,
        });
    }
    Ok(())
}

/// Same rule on resolved timestamps. Checked at destination creation,
/// since the destination is created later than the source.
pub fn invariant_absolute_ordering(
    source: &AbsoluteTimelocks,
    destination: &AbsoluteTimelocks,
) -> Result<(), ValidationError> {
    if destination.cancellation > source.cancellation {
        return Err(ValidationError::CrossChainTimelock {
            source_cancellation: source.cancellation,
            destination: destination.cancellation,
        });
    }
    Ok(())
}

/// Invariant: both escrows commit to the same order and hashlock.
pub fn invariant_hashlock_match(source: &Immutables, destination: &Immutables) -> bool {
    source.hash_lock == destination.hash_lock && source.order_hash == destination.order_hash
}

/// Invariant: atomicity. Never one side withdrawn and the other cancelled.
pub fn invariant_atomic_outcome(source: EscrowState, destination: EscrowState) -> bool {
    !matches!(
        (source, destination),
        (EscrowState::Withdrawn, EscrowState::Cancelled)
            | (EscrowState::Cancelled, EscrowState::Withdrawn)
    )
}
