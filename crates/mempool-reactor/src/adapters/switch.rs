//! In-process `PeerSwitch` over [`ChannelPeer`]s.

use parking_lot::{Mutex, RwLock};
use shared_types::NodeId;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use super::ChannelPeer;
use crate::domain::ReactorError;
use crate::ports::outbound::{Peer, PeerSwitch};

/// Tracks one node's peers and disconnects misbehaving ones.
#[derive(Debug, Default)]
pub struct InMemorySwitch {
    peers: RwLock<HashMap<NodeId, Arc<ChannelPeer>>>,
    stopped: Mutex<Vec<(NodeId, ReactorError)>>,
}

impl InMemorySwitch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, peer: Arc<ChannelPeer>) {
        self.peers.write().insert(peer.id(), peer);
    }

    pub fn peer(&self, id: &NodeId) -> Option<Arc<ChannelPeer>> {
        self.peers.read().get(id).cloned()
    }

    pub fn peers(&self) -> Vec<Arc<ChannelPeer>> {
        self.peers.read().values().cloned().collect()
    }

    /// Peers stopped for misbehaviour, with the reason, in order.
    pub fn stopped_peers(&self) -> Vec<(NodeId, ReactorError)> {
        self.stopped.lock().clone()
    }
}

impl PeerSwitch for InMemorySwitch {
    fn stop_peer_for_error(&self, peer: &NodeId, reason: ReactorError) {
        warn!(peer = %peer, reason = %reason, "Stopping peer for error");
        if let Some(conn) = self.peers.write().remove(peer) {
            conn.stop();
        }
        self.stopped.lock().push((*peer, reason));
    }
}
