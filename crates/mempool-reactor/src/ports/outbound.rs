//! Outbound (driven) ports for the mempool reactor.
//!
//! | Port | Provided by | Purpose |
//! |------|-------------|---------|
//! | `Mempool` | pending pool | admission, iteration, removal notifications |
//! | `EntryIterator` | pending pool | per-peer cursor with a wait signal |
//! | `TxValidator` | application | validation behind `check_tx` |
//! | `Peer` / `PeerState` | transport | best-effort send, liveness, height |
//! | `PeerSwitch` | transport | disconnecting misbehaving peers |

use async_trait::async_trait;
use shared_types::NodeId;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};

use crate::domain::{Entry, MempoolError, ReactorError, Tx, TxKey};
use crate::events::MempoolMessage;

/// Response code of a successful validation.
pub const CODE_TYPE_OK: u32 = 0;

/// Result of validating one transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckTxResponse {
    pub code: u32,
    pub log: String,
}

impl CheckTxResponse {
    pub fn ok() -> Self {
        Self {
            code: CODE_TYPE_OK,
            log: String::new(),
        }
    }

    pub fn rejected(code: u32, log: impl Into<String>) -> Self {
        Self {
            code,
            log: log.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == CODE_TYPE_OK
    }
}

/// Completion handle for an accepted `check_tx` call.
///
/// Resolves once validation finishes. Awaiting it is optional; the pool
/// completes validation whether or not anyone listens.
#[derive(Debug)]
pub struct CheckTxHandle {
    rx: oneshot::Receiver<CheckTxResponse>,
}

impl CheckTxHandle {
    /// Creates a handle and the sender the pool completes it with.
    pub fn channel() -> (oneshot::Sender<CheckTxResponse>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { rx })
    }

    /// Creates an already-completed handle.
    pub fn ready(response: CheckTxResponse) -> Self {
        let (tx, handle) = Self::channel();
        let _ = tx.send(response);
        handle
    }

    /// Waits for the validation result.
    ///
    /// `None` if the pool dropped the request without answering.
    pub async fn response(self) -> Option<CheckTxResponse> {
        self.rx.await.ok()
    }
}

/// Callback fired whenever a transaction leaves the pool, for any reason.
pub type TxRemovedCallback = Box<dyn Fn(&TxKey) + Send + Sync>;

/// Pending transaction pool as seen by the reactor.
///
/// Implementations must be internally synchronized.
pub trait Mempool: Send + Sync + 'static {
    /// Submits a transaction for admission.
    ///
    /// # Errors
    ///
    /// - `TxInCache`: already seen; validation skipped
    /// - `TxTooLarge` / `MempoolIsFull`: rejected before validation
    fn check_tx(&self, tx: Tx) -> Result<CheckTxHandle, MempoolError>;

    /// Whether the transaction is currently resident in the pool.
    fn contains(&self, key: &TxKey) -> bool;

    /// Creates a fresh cursor over the pool's entries.
    fn new_iterator(&self) -> Box<dyn EntryIterator>;

    /// Registers the callback fired for every removed transaction.
    fn set_tx_removed_callback(&self, callback: TxRemovedCallback);
}

/// Per-consumer cursor over pool entries in pool order.
///
/// No entry is yielded twice to the same iterator.
#[async_trait]
pub trait EntryIterator: Send {
    /// Resolves when `next_entry` may have something to return.
    ///
    /// Must be cancel safe: it is raced against disconnect and shutdown.
    async fn wait_next(&mut self);

    /// Advances the cursor. `None` means wait again.
    fn next_entry(&mut self) -> Option<Entry>;
}

/// Application-side transaction validation behind `Mempool::check_tx`.
#[async_trait]
pub trait TxValidator: Send + Sync + 'static {
    async fn check_tx(&self, tx: &Tx) -> CheckTxResponse;
}

/// Chain state reported by a peer.
///
/// Populated by another reactor (the one tracking consensus), so it may be
/// absent for a while after the peer connects.
pub trait PeerState: Send + Sync {
    /// Latest block height the peer reported.
    fn height(&self) -> i64;
}

/// A connected peer.
pub trait Peer: Send + Sync {
    fn id(&self) -> NodeId;

    /// False once the connection is stopping or stopped.
    fn is_running(&self) -> bool;

    /// Signal that flips to `true` when the peer disconnects. A dropped
    /// sender counts as disconnected.
    fn quit(&self) -> watch::Receiver<bool>;

    /// Queues a message without blocking. `false` if the queue is full or the
    /// peer is gone.
    fn try_send(&self, channel_id: u8, message: MempoolMessage) -> bool;

    /// The peer's chain state, once known.
    fn state(&self) -> Option<Arc<dyn PeerState>>;
}

/// Connection management used to drop misbehaving peers.
pub trait PeerSwitch: Send + Sync {
    fn stop_peer_for_error(&self, peer: &NodeId, reason: ReactorError);
}
