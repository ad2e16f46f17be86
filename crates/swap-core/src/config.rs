//! # Swap Configuration
//!
//! Everything the coordinator needs is passed in here at construction.
//! Nothing is read from process-wide state.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::{
    invariant_offsets_ordering, ChainId, Leg, LedgerKind, Side, TimelockOffsets, ValidationError,
};

/// Configuration for one ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Ledger identifier.
    pub chain_id: ChainId,
    /// Enforcement model.
    pub kind: LedgerKind,
    /// Seconds of chain time allowed between the deploy submission and
    /// the confirmed `Funded` state.
    pub funding_timeout_secs: u64,
}

/// Exponential backoff for transport failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// First delay.
    pub initial_delay_ms: u64,
    /// Delay cap.
    pub max_delay_ms: u64,
    /// `None` retries until the swap settles.
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based), doubling each time.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt.min(32)).unwrap_or(u64::MAX);
        let ms = self
            .initial_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms);
        Duration::from_millis(ms)
    }

    /// Whether another attempt is allowed after `attempts` failures.
    pub fn allows(&self, attempts: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempts < max)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            max_attempts: None,
        }
    }
}

/// Swap engine configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapConfig {
    /// Source (maker) ledger.
    pub source: ChainConfig,
    /// Destination (resolver) ledger.
    pub destination: ChainConfig,
    /// Source timelock offsets.
    pub source_timelocks: TimelockOffsets,
    /// Destination timelock offsets.
    pub destination_timelocks: TimelockOffsets,
    /// Watcher polling interval.
    pub poll_interval_ms: u64,
    /// Longest the coordinator waits for any observation before replanning.
    pub observation_timeout_ms: u64,
    /// Chain seconds after which a pending submission may be re-checked
    /// and resubmitted.
    pub resubmit_after_secs: u64,
    /// Destination time that must remain before its cancellation opens
    /// for the secret to be revealed.
    pub reveal_margin_secs: u64,
    /// Backoff for `ChainUnavailable`.
    pub retry: RetryPolicy,
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            source: ChainConfig {
                chain_id: ChainId(1),
                kind: LedgerKind::Contract,
                funding_timeout_secs: 600,
            },
            destination: ChainConfig {
                chain_id: ChainId(2),
                kind: LedgerKind::Script,
                funding_timeout_secs: 600,
            },
            source_timelocks: TimelockOffsets::new(300, 600, 3_600, 5_400),
            destination_timelocks: TimelockOffsets::new(300, 540, 3_000, 4_800),
            poll_interval_ms: 2_000,
            observation_timeout_ms: 30_000,
            resubmit_after_secs: 120,
            reveal_margin_secs: 300,
            retry: RetryPolicy::default(),
        }
    }
}

impl SwapConfig {
    /// Short windows and fast polling for tests.
    pub fn for_testing() -> Self {
        Self {
            source: ChainConfig {
                chain_id: ChainId(1),
                kind: LedgerKind::Contract,
                funding_timeout_secs: 30,
            },
            destination: ChainConfig {
                chain_id: ChainId(2),
                kind: LedgerKind::Contract,
                funding_timeout_secs: 30,
            },
            source_timelocks: TimelockOffsets::new(10, 60, 121, 181),
            destination_timelocks: TimelockOffsets::new(10, 50, 101, 150),
            poll_interval_ms: 500,
            observation_timeout_ms: 5_000,
            resubmit_after_secs: 30,
            reveal_margin_secs: 5,
            retry: RetryPolicy {
                initial_delay_ms: 100,
                max_delay_ms: 1_000,
                max_attempts: Some(5),
            },
        }
    }

    /// Reject configurations that could break atomicity.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.source.chain_id == self.destination.chain_id {
            return Err(ValidationError::InvalidConfig(
                "source and destination chain must differ".to_string(),
            ));
        }
        invariant_offsets_ordering(&self.source_timelocks, &self.destination_timelocks)?;
        for (side, chain) in [(Side::Source, &self.source), (Side::Destination, &self.destination)]
        {
            if chain.funding_timeout_secs == 0 {
                return Err(ValidationError::InvalidConfig(format!(
                    "{} funding timeout must be positive",
                    side
                )));
            }
        }
        if self.poll_interval_ms == 0 || self.observation_timeout_ms < self.poll_interval_ms {
            return Err(ValidationError::InvalidConfig(
                "observation timeout must cover at least one poll interval".to_string(),
            ));
        }
        if self.reveal_margin_secs >= self.destination_timelocks.cancellation {
            return Err(ValidationError::InvalidConfig(
                "reveal margin leaves no destination withdrawal time".to_string(),
            ));
        }
        if self.retry.initial_delay_ms == 0 || self.retry.max_delay_ms < self.retry.initial_delay_ms
        {
            return Err(ValidationError::InvalidConfig(
                "retry delays must be positive and capped above the initial delay".to_string(),
            ));
        }
        Ok(())
    }

    /// Source leg.
    pub fn source_leg(&self) -> Leg {
        Leg {
            chain: self.source.chain_id,
            kind: self.source.kind,
            offsets: self.source_timelocks,
        }
    }

    /// Destination leg.
    pub fn destination_leg(&self) -> Leg {
        Leg {
            chain: self.destination.chain_id,
            kind: self.destination.kind,
            offsets: self.destination_timelocks,
        }
    }

    /// Per-side chain configuration.
    pub fn chain(&self, side: Side) -> &ChainConfig {
        match side {
            Side::Source => &self.source,
            Side::Destination => &self.destination,
        }
    }

    /// Watcher polling interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Upper bound on a single coordinator wait.
    pub fn observation_timeout(&self) -> Duration {
        Duration::from_millis(self.observation_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SwapConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.destination.kind, LedgerKind::Script);
        assert!(config.retry.max_attempts.is_none());
    }

    #[test]
    fn test_testing_config() {
        let config = SwapConfig::for_testing();
        assert!(config.validate().is_ok());
        assert_eq!(config.source_timelocks.cancellation, 121);
        assert_eq!(config.destination_timelocks.cancellation, 101);
    }

    #[test]
    fn test_same_chain_rejected() {
        let mut config = SwapConfig::for_testing();
        config.destination.chain_id = config.source.chain_id;
        assert!(matches!(config.validate(), Err(ValidationError::InvalidConfig(_))));
    }

    #[test]
    fn test_destination_outliving_source_rejected() {
        let mut config = SwapConfig::for_testing();
        config.destination_timelocks = TimelockOffsets::new(10, 50, 130, 150);
        assert!(matches!(
            config.validate(),
            Err(ValidationError::CrossChainTimelock { .. })
        ));
    }

    #[test]
    fn test_reveal_margin_bounded() {
        let mut config = SwapConfig::for_testing();
        config.reveal_margin_secs = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retry_backoff_doubles_and_caps() {
        let policy = SwapConfig::for_testing().retry;
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(800));
        assert_eq!(policy.delay_for(4), Duration::from_millis(1_000));
        assert_eq!(policy.delay_for(60), Duration::from_millis(1_000));
    }

    #[test]
    fn test_retry_attempt_limit() {
        let policy = SwapConfig::for_testing().retry;
        assert!(policy.allows(4));
        assert!(!policy.allows(5));
        assert!(RetryPolicy::default().allows(u32::MAX - 1));
    }

    #[test]
    fn test_config_json_roundtrip_preserves_kind() {
        let config = SwapConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: SwapConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_legs_follow_config() {
        let config = SwapConfig::for_testing();
        assert_eq!(config.source_leg().chain, ChainId(1));
        assert_eq!(config.destination_leg().offsets, config.destination_timelocks);
    }
}
