//! # Chain Watcher
//!
//! One polling task per ledger. Each tick reads the chain time, the
//! confirmed escrow state and any new events, and forwards them to the
//! coordinator over a channel. The watcher never decides anything.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::domain::{EscrowRef, Side, SwapError, Timestamp};
use crate::ports::outbound::{ChainAdapter, ChainEvent, EscrowStatus, EventFilter};

/// One poll of one ledger.
#[derive(Clone, Debug)]
pub struct Observation {
    /// Ledger the poll covered.
    pub side: Side,
    /// Confirmed chain time.
    pub time: Timestamp,
    /// Confirmed escrow state, `None` if not deployed or not yet known.
    pub status: Option<EscrowStatus>,
    /// Events since the previous poll.
    pub events: Vec<ChainEvent>,
}

/// Message from a watcher to the coordinator.
#[derive(Clone, Debug)]
pub enum WatchUpdate {
    /// Successful poll.
    Observed(Observation),
    /// The ledger could not be reached this tick.
    Unavailable {
        /// Affected ledger
        side: Side,
        /// Transport error
        reason: String,
    },
}

/// Polling loop for one ledger.
pub struct ChainWatcher {
    side: Side,
    chain: Arc<dyn ChainAdapter>,
    escrow: watch::Receiver<Option<EscrowRef>>,
    updates: mpsc::Sender<WatchUpdate>,
    shutdown: watch::Receiver<bool>,
    poll_interval: Duration,
    next_index: u64,
}

impl ChainWatcher {
    /// Create a watcher. `escrow` publishes the reference once the
    /// coordinator has derived it.
    pub fn new(
        side: Side,
        chain: Arc<dyn ChainAdapter>,
        escrow: watch::Receiver<Option<EscrowRef>>,
        updates: mpsc::Sender<WatchUpdate>,
        shutdown: watch::Receiver<bool>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            side,
            chain,
            escrow,
            updates,
            shutdown,
            poll_interval,
            next_index: 0,
        }
    }

    /// Run on the current runtime until shutdown or until the
    /// coordinator drops its receiver.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!("[swap] {} watcher started on {}", self.side, self.chain.chain_id());

        loop {
            tokio::select! {
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let update = match self.poll_once().await {
                        Ok(observation) => WatchUpdate::Observed(observation),
                        Err(err) => {
                            warn!("[swap] {} watcher poll failed: {}", self.side, err);
                            WatchUpdate::Unavailable {
                                side: self.side,
                                reason: err.to_string(),
                            }
                        }
                    };
                    if self.updates.send(update).await.is_err() {
                        break;
                    }
                }
            }
        }
        debug!("[swap] {} watcher stopped", self.side);
    }

    /// Single poll. Events are only consumed once the whole poll succeeded,
    /// so a failed tick is replayed in full on the next one.
    pub async fn poll_once(&mut self) -> Result<Observation, SwapError> {
        let time = self.chain.current_time().await?;
        let escrow = *self.escrow.borrow();
        let Some(escrow) = escrow else {
            return Ok(Observation {
                side: self.side,
                time,
                status: None,
                events: Vec::new(),
            });
        };

        let status = self.chain.confirmed_state(&escrow).await?;
        let events = self
            .chain
            .watch_events(&EventFilter {
                escrow,
                from_index: self.next_index,
            })
            .await?;
        if let Some(last) = events.iter().map(|e| e.index).max() {
            self.next_index = last + 1;
        }
        Ok(Observation {
            side: self.side,
            time,
            status,
            events,
        })
    }
}
