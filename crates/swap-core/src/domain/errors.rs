//! # Domain Errors
//!
//! Error taxonomy for the atomic swap engine.
//!
//! | Variant | Recovery |
//! |---------|----------|
//! | `Validation` | Fatal, rejected before any on-chain action |
//! | `FundingTimeout` | Abort; cancel the other side once its window opens |
//! | `WindowMissed` | Wait for the next legal window or fall back to cancellation |
//! | `StateConflict` | Benign race between withdraw and cancel |
//! | `ChainUnavailable` | Retried with backoff, never abandoned |

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::value_objects::{ChainId, Side};

/// Hash type (32-byte digest).
pub type Hash = [u8; 32];

/// Address type (20-byte).
pub type Address = [u8; 20];

/// Chain timestamp in seconds.
pub type Timestamp = u64;

/// Required secret length in bytes.
pub const SECRET_LEN: usize = 32;

/// Validation failures. Always fatal for the affected operation.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ValidationError {
    /// Secret has the wrong length.
    #[error("Secret must be {expected} bytes, got {got}")]
    SecretLength {
        /// Required length
        expected: usize,
        /// Provided length
        got: usize,
    },

    /// Timelock offsets on one side are not strictly increasing.
    #[error("Timelocks on {side} side are not strictly increasing: {detail}")]
    TimelockOrdering {
        /// Offending side
        side: Side,
        /// Which stages collided
        detail: String,
    },

    /// Destination cancellation opens after source cancellation.
    #[error("Destination cancellation ({destination}) opens after source cancellation ({source_cancellation})")]
    CrossChainTimelock {
        /// Source cancellation start
        source_cancellation: u64,
        /// Destination cancellation start
        destination: u64,
    },

    /// Timelock arithmetic overflowed.
    #[error("Timelock overflow resolving offset {offset} at {creation_time}")]
    TimelockOverflow {
        /// Creation time
        creation_time: u64,
        /// Offset being added
        offset: u64,
    },

    /// Immutables presented do not derive the escrow reference.
    #[error("Immutables mismatch on {side} escrow: {field}")]
    ImmutablesMismatch {
        /// Escrow side
        side: Side,
        /// Field or reason
        field: String,
    },

    /// Locked value on chain differs from recorded immutables.
    #[error("Funding mismatch on {side} escrow: expected {expected}, locked {locked}")]
    FundingMismatch {
        /// Escrow side
        side: Side,
        /// Expected amount
        expected: u128,
        /// Amount actually locked
        locked: u128,
    },

    /// Locked asset or safety deposit differs from recorded immutables.
    #[error("Locked terms mismatch on {side} escrow: {field}")]
    LockedTermsMismatch {
        /// Escrow side
        side: Side,
        /// What differed
        field: String,
    },

    /// Hashlock already commits a different order.
    #[error("Hashlock {hash_lock} already commits order {order}")]
    HashLockReused {
        /// Reused hashlock
        hash_lock: String,
        /// Order holding the claim
        order: String,
    },

    /// Amount is zero.
    #[error("Amount must be positive")]
    ZeroAmount,

    /// Malformed order.
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    /// Signature does not recover the maker.
    #[error("Invalid order signature")]
    InvalidSignature,

    /// Resolver is not on the order whitelist.
    #[error("Resolver {0} is not whitelisted")]
    ResolverNotWhitelisted(String),

    /// Configuration rejected.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Atomic swap error types.
#[derive(Debug, Error)]
pub enum SwapError {
    /// Rejected before any chain interaction.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Escrow not observed funded before the deadline.
    #[error("Funding timeout on {side} escrow (deadline {deadline})")]
    FundingTimeout {
        /// Escrow side
        side: Side,
        /// Chain-time deadline that elapsed
        deadline: Timestamp,
    },

    /// Action attempted outside its legal window.
    #[error("Window missed for {action} on {side} escrow at {now}")]
    WindowMissed {
        /// Escrow side
        side: Side,
        /// Attempted action
        action: String,
        /// Chain time of the attempt
        now: Timestamp,
    },

    /// Escrow already reached a conflicting state.
    #[error("State conflict on {side} escrow: expected {expected}, found {found}")]
    StateConflict {
        /// Escrow side
        side: Side,
        /// Required state
        expected: String,
        /// Observed state
        found: String,
    },

    /// Swap phase change not allowed.
    #[error("Invalid swap transition from {from} to {to}")]
    InvalidPhaseTransition {
        /// Current phase
        from: String,
        /// Requested phase
        to: String,
    },

    /// Ledger could not be reached.
    #[error("Chain {chain} unavailable: {reason}")]
    ChainUnavailable {
        /// Chain identifier
        chain: ChainId,
        /// Transport reason
        reason: String,
    },

    /// Secret does not open the hashlock.
    #[error("Invalid secret")]
    InvalidSecret,

    /// Caller not allowed in the current window.
    #[error("Unauthorized caller")]
    Unauthorized,

    /// Escrow reference unknown to the ledger.
    #[error("Escrow not found: {0}")]
    EscrowNotFound(String),

    /// Order nonce already consumed.
    #[error("Order already filled (nonce {nonce})")]
    OrderAlreadyFilled {
        /// Consumed nonce
        nonce: u64,
    },

    /// Handoff artifact could not be read or written.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Watcher channel closed.
    #[error("Coordinator shut down: {0}")]
    Shutdown(String),
}

impl SwapError {
    /// Transport failures are retried with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ChainUnavailable { .. })
    }

    /// Withdraw/cancel races resolved by the escrow itself.
    pub fn is_benign_race(&self) -> bool {
        matches!(self, Self::StateConflict { .. })
    }
}

impl From<std::io::Error> for SwapError {
    fn from(err: std::io::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for SwapError {
    fn from(err: serde_json::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_length_error() {
        let err = ValidationError::SecretLength { expected: 32, got: 16 };
        assert!(err.to_string().contains("32"));
        assert!(err.to_string().contains("16"));
    }

    #[test]
    fn test_cross_chain_timelock_error() {
        let err = ValidationError::CrossChainTimelock {
            source_cancellation: 121,
            destination: 150,
        };
        assert!(err.to_string().contains("150"));
    }

    #[test]
    fn test_validation_converts_into_swap_error() {
        let err: SwapError = ValidationError::ZeroAmount.into();
        assert!(matches!(err, SwapError::Validation(ValidationError::ZeroAmount)));
    }

    #[test]
    fn test_chain_unavailable_is_retryable() {
        let err = SwapError::ChainUnavailable {
            chain: ChainId(1),
            reason: "connection refused".to_string(),
        };
        assert!(err.is_retryable());
        assert!(!err.is_benign_race());
    }

    #[test]
    fn test_state_conflict_is_benign() {
        let err = SwapError::StateConflict {
            side: Side::Source,
            expected: "Funded".to_string(),
            found: "Cancelled".to_string(),
        };
        assert!(err.is_benign_race());
        assert!(!err.is_retryable());
    }
}
