//! # TimeLock Schedule
//!
//! Relative offsets per side, resolved once against the escrow's own
//! creation time into absolute chain timestamps.
//!
//! ```text
//! | locked | taker withdraws | anyone withdraws | taker cancels | anyone cancels →
//! ^        ^                 ^                  ^               ^
//! deployed withdrawal        public_withdrawal  cancellation    public_cancellation
//! ```

use serde::{Deserialize, Serialize};

use super::errors::{Timestamp, ValidationError};
use super::value_objects::Side;

/// Timelock stages, in the order they open.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Private withdrawal (taker with secret).
    Withdrawal,
    /// Public withdrawal (anyone with secret).
    PublicWithdrawal,
    /// Private cancellation (taker).
    Cancellation,
    /// Public cancellation (anyone).
    PublicCancellation,
}

/// Offsets in seconds from escrow creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelockOffsets {
    /// Private withdrawal start.
    pub withdrawal: u64,
    /// Public withdrawal start.
    pub public_withdrawal: u64,
    /// Private cancellation start.
    pub cancellation: u64,
    /// Public cancellation start.
    pub public_cancellation: u64,
}

impl TimelockOffsets {
    /// Create offsets (unvalidated).
    pub fn new(
        withdrawal: u64,
        public_withdrawal: u64,
        cancellation: u64,
        public_cancellation: u64,
    ) -> Self {
        Self {
            withdrawal,
            public_withdrawal,
            cancellation,
            public_cancellation,
        }
    }

    /// Offset for a stage.
    pub fn get(&self, stage: Stage) -> u64 {
        match stage {
            Stage::Withdrawal => self.withdrawal,
            Stage::PublicWithdrawal => self.public_withdrawal,
            Stage::Cancellation => self.cancellation,
            Stage::PublicCancellation => self.public_cancellation,
        }
    }

    /// Stages must be strictly increasing.
    pub fn validate(&self, side: Side) -> Result<(), ValidationError> {
        let pairs = [
            (Stage::Withdrawal, Stage::PublicWithdrawal),
            (Stage::PublicWithdrawal, Stage::Cancellation),
            (Stage::Cancellation, Stage::PublicCancellation),
        ];
        for (earlier, later) in pairs {
            if self.get(earlier) >= self.get(later) {
                return Err(ValidationError::TimelockOrdering {
                    side,
                    detail: format!(
                        "{:?}={} must be < {:?}={}",
                        earlier,
                        self.get(earlier),
                        later,
                        self.get(later)
                    ),
                });
            }
        }
        Ok(())
    }

    /// Convert to absolute timestamps. Validates first.
    pub fn resolve(
        &self,
        side: Side,
        creation_time: Timestamp,
    ) -> Result<AbsoluteTimelocks, ValidationError> {
        self.validate(side)?;
        let at = |offset: u64| {
            creation_time
                .checked_add(offset)
                .ok_or(ValidationError::TimelockOverflow {
                    creation_time,
                    offset,
                })
        };
        Ok(AbsoluteTimelocks {
            deployed_at: creation_time,
            withdrawal: at(self.withdrawal)?,
            public_withdrawal: at(self.public_withdrawal)?,
            cancellation: at(self.cancellation)?,
            public_cancellation: at(self.public_cancellation)?,
        })
    }
}

/// Absolute chain timestamps, frozen into the immutables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbsoluteTimelocks {
    /// Creation time the offsets were resolved against.
    pub deployed_at: Timestamp,
    /// Private withdrawal start.
    pub withdrawal: Timestamp,
    /// Public withdrawal start.
    pub public_withdrawal: Timestamp,
    /// Private cancellation start.
    pub cancellation: Timestamp,
    /// Public cancellation start.
    pub public_cancellation: Timestamp,
}

/// Window the escrow is in at a given chain time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Window {
    /// Nothing allowed yet.
    Locked,
    /// Taker may withdraw.
    PrivateWithdrawal,
    /// Anyone with the secret may withdraw.
    PublicWithdrawal,
    /// Taker may cancel.
    PrivateCancellation,
    /// Anyone may cancel.
    PublicCancellation,
}

impl AbsoluteTimelocks {
    /// Timestamp for a stage.
    pub fn get(&self, stage: Stage) -> Timestamp {
        match stage {
            Stage::Withdrawal => self.withdrawal,
            Stage::PublicWithdrawal => self.public_withdrawal,
            Stage::Cancellation => self.cancellation,
            Stage::PublicCancellation => self.public_cancellation,
        }
    }

    /// Classify `now`.
    pub fn window_at(&self, now: Timestamp) -> Window {
        if now >= self.public_cancellation {
            Window::PublicCancellation
        } else if now >= self.cancellation {
            Window::PrivateCancellation
        } else if now >= self.public_withdrawal {
            Window::PublicWithdrawal
        } else if now >= self.withdrawal {
            Window::PrivateWithdrawal
        } else {
            Window::Locked
        }
    }

    /// Next stage boundary strictly after `now`, if any.
    pub fn next_boundary(&self, now: Timestamp) -> Option<Timestamp> {
        [
            self.withdrawal,
            self.public_withdrawal,
            self.cancellation,
            self.public_cancellation,
        ]
        .into_iter()
        .find(|t| *t > now)
    }

    /// Packed big-endian layout used for hashing: deployed_at then the four stages.
    pub fn pack(&self) -> [u8; 40] {
        let mut bytes = [0u8; 40];
        bytes[0..8].copy_from_slice(&self.deployed_at.to_be_bytes());
        bytes[8..16].copy_from_slice(&self.withdrawal.to_be_bytes());
        bytes[16..24].copy_from_slice(&self.public_withdrawal.to_be_bytes());
        bytes[24..32].copy_from_slice(&self.cancellation.to_be_bytes());
        bytes[32..40].copy_from_slice(&self.public_cancellation.to_be_bytes());
        bytes
    }
}
