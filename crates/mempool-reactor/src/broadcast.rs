//! # Broadcast Routine
//!
//! One task per connected peer that walks the pool with its own cursor and
//! sends each entry the peer does not already hold.
//!
//! ```text
//!            ┌───────── wait_next / quit / shutdown ─────────┐
//!            ↓                                               │
//!   [AwaitingEntry] ──entry──→ [HaveEntry] ──sent/skipped────┘
//!            │                    │    ↑
//!       quit/shutdown     lagging/full │ sleep
//!            ↓                    ↓    │
//!       [Terminated] ←──quit── [Throttled]
//! ```
//!
//! An entry is never dropped while throttled: the loop keeps it and retries
//! after `peer_catchup_sleep_interval`. Each message carries exactly one
//! transaction.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::domain::{Entry, SenderId, SenderTable};
use crate::events::{MempoolMessage, MEMPOOL_CHANNEL};
use crate::ports::outbound::{EntryIterator, Peer};

/// What happened to the held entry on one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Handed to the peer's send queue.
    Sent,
    /// Peer already holds the transaction.
    Skipped,
    /// Kept for a later attempt.
    Throttled(ThrottleReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleReason {
    /// No chain state reported by the peer yet.
    UnknownHeight,
    /// Peer is more than one block behind the entry's admission height.
    CatchingUp { peer_height: i64, entry_height: i64 },
    /// Peer's send queue is full.
    SendFailed,
}

/// State owned by one peer's broadcast task.
pub struct BroadcastRoutine {
    peer: Arc<dyn Peer>,
    peer_id: SenderId,
    senders: Arc<SenderTable>,
    iter: Box<dyn EntryIterator>,
    quit: watch::Receiver<bool>,
    shutdown: watch::Receiver<bool>,
    retry_interval: Duration,
}

impl BroadcastRoutine {
    pub fn new(
        peer: Arc<dyn Peer>,
        peer_id: SenderId,
        senders: Arc<SenderTable>,
        iter: Box<dyn EntryIterator>,
        shutdown: watch::Receiver<bool>,
        retry_interval: Duration,
    ) -> Self {
        let quit = peer.quit();
        Self {
            peer,
            peer_id,
            senders,
            iter,
            quit,
            shutdown,
            retry_interval,
        }
    }

    /// Runs until the peer disconnects or the reactor stops.
    pub async fn run(mut self) {
        let mut held: Option<Entry> = None;

        loop {
            // Both signals may be set while an entry is ready; check first.
            if self.stopped() {
                break;
            }

            let entry = match held.take() {
                Some(entry) => entry,
                None => {
                    if !self.await_entry().await {
                        break;
                    }
                    match self.iter.next_entry() {
                        Some(entry) => entry,
                        // Nothing there or removed meanwhile.
                        None => continue,
                    }
                }
            };

            match self.offer(&entry) {
                Outcome::Sent | Outcome::Skipped => {}
                Outcome::Throttled(reason) => {
                    trace!(peer = %self.peer.id(), ?reason, "Deferring tx");
                    held = Some(entry);
                    if !self.pause().await {
                        break;
                    }
                }
            }
        }

        debug!(peer = %self.peer.id(), "Broadcast routine stopped");
    }

    /// Tries to deliver `entry` once.
    pub fn offer(&self, entry: &Entry) -> Outcome {
        let Some(state) = self.peer.state() else {
            return Outcome::Throttled(ThrottleReason::UnknownHeight);
        };

        let peer_height = state.height();
        if peer_height < entry.height() - 1 {
            return Outcome::Throttled(ThrottleReason::CatchingUp {
                peer_height,
                entry_height: entry.height(),
            });
        }

        if self.senders.is_sender(entry.key(), self.peer_id) {
            return Outcome::Skipped;
        }

        if self
            .peer
            .try_send(MEMPOOL_CHANNEL, MempoolMessage::single(entry.tx()))
        {
            Outcome::Sent
        } else {
            Outcome::Throttled(ThrottleReason::SendFailed)
        }
    }

    fn stopped(&self) -> bool {
        *self.shutdown.borrow() || !self.peer.is_running()
    }

    /// Waits for the iterator. `false` on disconnect or shutdown.
    async fn await_entry(&mut self) -> bool {
        tokio::select! {
            _ = self.iter.wait_next() => true,
            _ = signalled(&mut self.quit) => false,
            _ = signalled(&mut self.shutdown) => false,
        }
    }

    /// Sleeps one retry interval. `false` on disconnect or shutdown.
    async fn pause(&mut self) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(self.retry_interval) => true,
            _ = signalled(&mut self.quit) => false,
            _ = signalled(&mut self.shutdown) => false,
        }
    }
}

/// Resolves once the flag is set. A dropped sender counts as set.
async fn signalled(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|set| *set).await;
}
