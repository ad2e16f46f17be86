//! # Escrow Transactions
//!
//! One variant per escrow command, each carrying the exact immutables
//! recorded for that escrow.

use serde::{Deserialize, Serialize};

use super::errors::{Address, Timestamp};
use super::escrow::EscrowAction;
use super::immutables::Immutables;
use super::secure_secret::Secret;
use super::value_objects::{EscrowRef, Side};

/// Typed escrow command submitted through a chain adapter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transaction {
    /// Create and fund the escrow.
    Deploy {
        /// Leg
        side: Side,
        /// Frozen parameters
        immutables: Immutables,
        /// Source cancellation start, required for destination deploys.
        source_cancellation: Option<Timestamp>,
    },
    /// Release with the secret.
    Withdraw {
        /// Leg
        side: Side,
        /// Target escrow
        escrow: EscrowRef,
        /// Preimage of the hashlock
        secret: Secret,
        /// Recorded immutables
        immutables: Immutables,
        /// Submitting party
        caller: Address,
    },
    /// Return to the depositor.
    Cancel {
        /// Leg
        side: Side,
        /// Target escrow
        escrow: EscrowRef,
        /// Recorded immutables
        immutables: Immutables,
        /// Submitting party
        caller: Address,
    },
}

impl Transaction {
    /// Leg this transaction targets.
    pub fn side(&self) -> Side {
        match self {
            Self::Deploy { side, .. } | Self::Withdraw { side, .. } | Self::Cancel { side, .. } => {
                *side
            }
        }
    }

    /// Command kind.
    pub fn action(&self) -> EscrowAction {
        match self {
            Self::Deploy { .. } => EscrowAction::Deploy,
            Self::Withdraw { .. } => EscrowAction::Withdraw,
            Self::Cancel { .. } => EscrowAction::Cancel,
        }
    }

    /// Immutables carried by the command.
    pub fn immutables(&self) -> &Immutables {
        match self {
            Self::Deploy { immutables, .. }
            | Self::Withdraw { immutables, .. }
            | Self::Cancel { immutables, .. } => immutables,
        }
    }
}
