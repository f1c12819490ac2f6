//! # Peer Identity Registry
//!
//! Hands out compact [`SenderId`]s to connected peers so that per-transaction
//! sender sets store two bytes per peer instead of a full `NodeId`.
//!
//! Ids come from `[1, max]`; `0` is [`UNKNOWN_PEER_ID`]. Allocation continues
//! round-robin from the last assigned id, so a just-released id is the last
//! candidate to be handed out again.

use parking_lot::Mutex;
use shared_types::NodeId;
use std::collections::{HashMap, HashSet};

use super::{ReactorError, SenderId, MAX_ACTIVE_IDS, UNKNOWN_PEER_ID};

/// Thread-safe `NodeId → SenderId` registry.
#[derive(Debug)]
pub struct PeerIdRegistry {
    max: SenderId,
    inner: Mutex<IdState>,
}

#[derive(Debug)]
struct IdState {
    peer_map: HashMap<NodeId, SenderId>,
    active: HashSet<SenderId>,
    next_id: SenderId,
}

impl IdState {
    /// Finds the next unused id, starting at `next_id` and wrapping past `max`.
    fn next_peer_id(&mut self, max: SenderId) -> Result<SenderId, ReactorError> {
        if self.active.len() >= max as usize {
            return Err(ReactorError::NoFreePeerIds { max });
        }

        // Terminates: fewer than `max` of the `max` candidates are taken.
        loop {
            let candidate = self.next_id;
            self.next_id = if candidate >= max { 1 } else { candidate + 1 };
            if !self.active.contains(&candidate) {
                return Ok(candidate);
            }
        }
    }
}

impl PeerIdRegistry {
    /// Creates a registry able to track up to [`MAX_ACTIVE_IDS`] peers.
    pub fn new() -> Self {
        Self::with_max(MAX_ACTIVE_IDS)
    }

    /// Creates a registry that assigns ids in `[1, max]`.
    ///
    /// `max` is clamped to at least 1.
    pub fn with_max(max: SenderId) -> Self {
        Self {
            max: max.max(1),
            inner: Mutex::new(IdState {
                peer_map: HashMap::new(),
                active: HashSet::new(),
                next_id: 1,
            }),
        }
    }

    /// Assigns an unused id to `peer`. Reserving twice is a no-op.
    ///
    /// # Errors
    ///
    /// `NoFreePeerIds` when every id is held by a connected peer.
    pub fn reserve_for_peer(&self, peer: &NodeId) -> Result<(), ReactorError> {
        let mut state = self.inner.lock();
        if state.peer_map.contains_key(peer) {
            return Ok(());
        }

        let id = state.next_peer_id(self.max)?;
        state.peer_map.insert(*peer, id);
        state.active.insert(id);
        Ok(())
    }

    /// Returns the peer's id, or [`UNKNOWN_PEER_ID`] if it holds none.
    pub fn get_for_peer(&self, peer: &NodeId) -> SenderId {
        self.inner
            .lock()
            .peer_map
            .get(peer)
            .copied()
            .unwrap_or(UNKNOWN_PEER_ID)
    }

    /// Releases the peer's id. Unknown peers are ignored.
    pub fn reclaim(&self, peer: &NodeId) {
        let mut state = self.inner.lock();
        if let Some(id) = state.peer_map.remove(peer) {
            state.active.remove(&id);
        }
    }

    /// Number of ids currently held.
    pub fn active_count(&self) -> usize {
        self.inner.lock().active.len()
    }

    /// Upper bound of the id range.
    pub fn max(&self) -> SenderId {
        self.max
    }
}

impl Default for PeerIdRegistry {
    fn default() -> Self {
        Self::new()
    }
}
