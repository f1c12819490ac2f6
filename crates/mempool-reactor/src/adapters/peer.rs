//! In-process transport peer backed by a bounded channel.

use parking_lot::RwLock;
use shared_types::NodeId;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::events::{Envelope, MempoolMessage};
use crate::ports::outbound::{Peer, PeerState};

/// Height reported by a peer. Updated in place as the peer advances.
#[derive(Debug, Default)]
pub struct HeightState(AtomicI64);

impl HeightState {
    pub fn new(height: i64) -> Self {
        Self(AtomicI64::new(height))
    }

    pub fn set(&self, height: i64) {
        self.0.store(height, Ordering::SeqCst);
    }
}

impl PeerState for HeightState {
    fn height(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Connection from `local` to `remote`.
///
/// Messages sent through it arrive at the returned receiver tagged with
/// `local` as their source, ready to be handed to the remote reactor.
#[derive(Debug)]
pub struct ChannelPeer {
    local: NodeId,
    remote: NodeId,
    outbound: mpsc::Sender<Envelope>,
    quit: watch::Sender<bool>,
    state: RwLock<Option<Arc<HeightState>>>,
}

impl ChannelPeer {
    /// Creates the peer with an outbound queue of `capacity` messages.
    ///
    /// The peer reports no height until [`set_height`](Self::set_height) is
    /// called.
    pub fn new(
        local: NodeId,
        remote: NodeId,
        capacity: usize,
    ) -> (Arc<Self>, mpsc::Receiver<Envelope>) {
        let (outbound, rx) = mpsc::channel(capacity.max(1));
        let (quit, _) = watch::channel(false);
        let peer = Arc::new(Self {
            local,
            remote,
            outbound,
            quit,
            state: RwLock::new(None),
        });
        (peer, rx)
    }

    pub fn local(&self) -> NodeId {
        self.local
    }

    /// Records the remote's latest height.
    pub fn set_height(&self, height: i64) {
        let mut state = self.state.write();
        match state.as_ref() {
            Some(current) => current.set(height),
            None => *state = Some(Arc::new(HeightState::new(height))),
        }
    }

    /// Disconnects. Idempotent.
    pub fn stop(&self) {
        if !self.quit.send_replace(true) {
            debug!(peer = %self.remote, "Peer stopped");
        }
    }
}

impl Peer for ChannelPeer {
    fn id(&self) -> NodeId {
        self.remote
    }

    fn is_running(&self) -> bool {
        !*self.quit.borrow() && !self.outbound.is_closed()
    }

    fn quit(&self) -> watch::Receiver<bool> {
        self.quit.subscribe()
    }

    fn try_send(&self, channel_id: u8, message: MempoolMessage) -> bool {
        if *self.quit.borrow() {
            return false;
        }
        self.outbound
            .try_send(Envelope {
                src: self.local,
                channel_id,
                message,
            })
            .is_ok()
    }

    fn state(&self) -> Option<Arc<dyn PeerState>> {
        self.state
            .read()
            .clone()
            .map(|state| state as Arc<dyn PeerState>)
    }
}
