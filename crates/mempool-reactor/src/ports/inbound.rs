//! Inbound port: the reactor surface the transport drives.

use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::domain::ReactorError;
use crate::events::{ChannelDescriptor, Envelope};
use crate::ports::outbound::Peer;

/// Peer lifecycle and message delivery, as called by the switch.
///
/// Call order per peer: `init_peer` → `add_peer` → any number of `receive`
/// → `remove_peer`.
///
/// `add_peer` and `receive` spawn tokio tasks, so both must be called from
/// within a runtime.
pub trait Reactor: Send + Sync {
    /// Channels this reactor listens on.
    ///
    /// # Errors
    ///
    /// `Encode` if a channel's message capacity cannot be computed.
    fn channels(&self) -> Result<Vec<ChannelDescriptor>, ReactorError>;

    /// Prepares per-peer state before the peer is started.
    ///
    /// # Errors
    ///
    /// `NoFreePeerIds` when the peer cannot be given a compact id. The peer
    /// may still be added but will not be gossiped to.
    fn init_peer(&self, peer: &dyn Peer) -> Result<(), ReactorError>;

    /// Called once the peer is running. Returns the broadcast task, if one
    /// was started.
    fn add_peer(&self, peer: Arc<dyn Peer>) -> Option<JoinHandle<()>>;

    /// Called after the peer stopped.
    fn remove_peer(&self, peer: &dyn Peer);

    /// Handles one message received on a reactor channel.
    ///
    /// Never blocks on validation; admission results are handled on spawned
    /// tasks.
    fn receive(&self, envelope: Envelope);
}
