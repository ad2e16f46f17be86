//! # Domain Value Objects
//!
//! Immutable value types shared by escrows, orders and the coordinator.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::Hash;

/// Numeric chain identifier, bound into order signatures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChainId(pub u64);

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chain-{}", self.0)
    }
}

/// How a ledger enforces the escrow.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LedgerKind {
    /// Smart-contract ledger: private and public windows, bounded withdrawal.
    #[default]
    Contract,
    /// Script ledger: hash path for the recipient, timeout path for the sender.
    /// No public windows; the hash path never expires.
    Script,
}

impl LedgerKind {
    /// Public windows are only enforceable by contracts.
    pub fn supports_public_windows(&self) -> bool {
        matches!(self, Self::Contract)
    }

    /// Contracts close the withdrawal window when cancellation opens.
    pub fn withdrawal_closes_at_cancellation(&self) -> bool {
        matches!(self, Self::Contract)
    }
}

/// Which leg of the swap an escrow belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Maker's funds, created first.
    Source,
    /// Resolver's funds, created once the source is funded.
    Destination,
}

impl Side {
    /// Stable tag used when deriving escrow references.
    pub fn tag(&self) -> u8 {
        match self {
            Side::Source => 0,
            Side::Destination => 1,
        }
    }

    /// The other leg.
    pub fn counterpart(&self) -> Side {
        match self {
            Side::Source => Side::Destination,
            Side::Destination => Side::Source,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Source => f.write_str("source"),
            Side::Destination => f.write_str("destination"),
        }
    }
}

/// Escrow lifecycle.
///
/// ```text
/// Created ──deploy confirmed──→ Funded ──secret──→ Withdrawn
///                                  └──timeout──→ Cancelled
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscrowState {
    /// Immutables computed, contract not yet confirmed on chain.
    #[default]
    Created,
    /// Deployment confirmed, value locked.
    Funded,
    /// Secret presented, funds released to the recipient.
    Withdrawn,
    /// Depositor reclaimed funds.
    Cancelled,
}

impl EscrowState {
    /// Check if transition is valid.
    pub fn can_transition_to(&self, next: EscrowState) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::Funded)
                | (Self::Funded, Self::Withdrawn)
                | (Self::Funded, Self::Cancelled)
        )
    }

    /// Check if terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Withdrawn | Self::Cancelled)
    }
}

impl fmt::Display for EscrowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Swap-level progress.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapPhase {
    /// Order filled, nothing on chain yet.
    #[default]
    Initiated,
    /// Source escrow funded.
    SourceLocked,
    /// Both escrows funded.
    BothLocked,
    /// Secret released on the source chain.
    SecretRevealed,
    /// Both escrows withdrawn.
    Completed,
    /// Happy path abandoned, reclaiming funded escrows.
    Refunding,
    /// All funded escrows cancelled.
    Refunded,
    /// Nothing was ever funded.
    Aborted,
}

impl SwapPhase {
    /// Check if transition is valid.
    pub fn can_transition_to(&self, next: SwapPhase) -> bool {
        match (self, next) {
            (Self::Initiated, Self::SourceLocked) => true,
            (Self::Initiated, Self::Aborted) => true,
            (Self::Initiated, Self::Refunding) => true,
            (Self::SourceLocked, Self::BothLocked) => true,
            (Self::SourceLocked, Self::Refunding) => true,
            (Self::BothLocked, Self::SecretRevealed) => true,
            (Self::BothLocked, Self::Refunding) => true,
            (Self::SecretRevealed, Self::Completed) => true,
            (Self::SecretRevealed, Self::Refunding) => true,
            (Self::Refunding, Self::Refunded) => true,
            (Self::Refunding, Self::Aborted) => true,
            _ => false,
        }
    }

    /// Check if terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Refunded | Self::Aborted)
    }
}

/// On-chain escrow identifier, derived from the immutables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EscrowRef(pub Hash);

impl fmt::Display for EscrowRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0[..6]))
    }
}

/// Submitted transaction reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxRef(pub Hash);

impl fmt::Display for TxRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0[..6]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escrow_state_created_to_funded() {
        assert!(EscrowState::Created.can_transition_to(EscrowState::Funded));
    }

    #[test]
    fn test_escrow_state_no_skip_funding() {
        assert!(!EscrowState::Created.can_transition_to(EscrowState::Withdrawn));
        assert!(!EscrowState::Created.can_transition_to(EscrowState::Cancelled));
    }

    #[test]
    fn test_escrow_terminal_states_are_exclusive() {
        assert!(!EscrowState::Withdrawn.can_transition_to(EscrowState::Cancelled));
        assert!(!EscrowState::Cancelled.can_transition_to(EscrowState::Withdrawn));
        assert!(EscrowState::Withdrawn.is_terminal());
        assert!(EscrowState::Cancelled.is_terminal());
        assert!(!EscrowState::Funded.is_terminal());
    }

    #[test]
    fn test_swap_phase_happy_path() {
        assert!(SwapPhase::Initiated.can_transition_to(SwapPhase::SourceLocked));
        assert!(SwapPhase::SourceLocked.can_transition_to(SwapPhase::BothLocked));
        assert!(SwapPhase::BothLocked.can_transition_to(SwapPhase::SecretRevealed));
        assert!(SwapPhase::SecretRevealed.can_transition_to(SwapPhase::Completed));
    }

    #[test]
    fn test_swap_phase_cannot_complete_without_reveal() {
        assert!(!SwapPhase::BothLocked.can_transition_to(SwapPhase::Completed));
        assert!(!SwapPhase::Refunding.can_transition_to(SwapPhase::Completed));
    }

    #[test]
    fn test_swap_phase_terminal() {
        assert!(SwapPhase::Completed.is_terminal());
        assert!(SwapPhase::Refunded.is_terminal());
        assert!(SwapPhase::Aborted.is_terminal());
        assert!(!SwapPhase::Refunding.is_terminal());
    }

    #[test]
    fn test_ledger_kind_capabilities() {
        assert!(LedgerKind::Contract.supports_public_windows());
        assert!(!LedgerKind::Script.supports_public_windows());
        assert!(!LedgerKind::Script.withdrawal_closes_at_cancellation());
    }

    #[test]
    fn test_side_counterpart() {
        assert_eq!(Side::Source.counterpart(), Side::Destination);
        assert_ne!(Side::Source.tag(), Side::Destination.tag());
    }
}
