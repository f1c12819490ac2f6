//! # Mempool Reactor Service
//!
//! Implements the [`Reactor`] inbound port on top of the pool and transport
//! ports.
//!
//! ## Responsibilities
//!
//! - Peer lifecycle: compact id per peer, one [`BroadcastRoutine`] per peer
//! - Inbound: every received transaction goes through `Mempool::check_tx`;
//!   accepted ones record their source peer as a sender
//! - Cleanup: the pool's removal callback drops the sender set of every
//!   transaction that leaves the pool
//!
//! ## Error Taxonomy
//!
//! | Condition | Handling |
//! |-----------|----------|
//! | Unknown message type / undecodable bytes | peer stopped through `PeerSwitch` |
//! | Empty `Txs` batch | logged at error level, nothing else |
//! | `TxInCache` | debug log, sender not recorded |
//! | Other admission error | info log, remaining txs still processed |
//! | No free peer id | returned from `init_peer`; peer runs without gossip |

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};

use shared_types::NodeId;

use crate::broadcast::BroadcastRoutine;
use crate::domain::{
    MempoolError, PeerIdRegistry, ReactorConfig, ReactorError, SenderTable, Tx,
    UNKNOWN_PEER_ID,
};
use crate::events::{ChannelDescriptor, Envelope, MempoolMessage, Txs};
use crate::ports::inbound::Reactor;
use crate::ports::outbound::{Mempool, Peer, PeerSwitch};

/// The mempool gossip reactor.
///
/// ## Thread Safety
///
/// Shared across the transport's tasks via `Arc`. The registry and the
/// sender table carry their own locks; the reactor adds none.
pub struct MempoolReactor<M, S>
where
    M: Mempool,
    S: PeerSwitch,
{
    config: ReactorConfig,
    mempool: Arc<M>,
    switch: Arc<S>,
    ids: Arc<PeerIdRegistry>,
    senders: Arc<SenderTable>,
    /// Flipped to `true` by `on_stop`; every broadcast routine watches it.
    shutdown: watch::Sender<bool>,
}

impl<M, S> MempoolReactor<M, S>
where
    M: Mempool,
    S: PeerSwitch,
{
    /// Creates the reactor and hooks sender cleanup into the pool.
    pub fn new(config: ReactorConfig, mempool: Arc<M>, switch: Arc<S>) -> Self {
        let senders = Arc::new(SenderTable::new());

        let table = Arc::clone(&senders);
        mempool.set_tx_removed_callback(Box::new(move |key| table.remove_all(key)));

        let (shutdown, _) = watch::channel(false);

        Self {
            config,
            mempool,
            switch,
            ids: Arc::new(PeerIdRegistry::new()),
            senders,
            shutdown,
        }
    }

    /// Replaces the peer id registry, e.g. with a smaller id space.
    pub fn with_peer_ids(mut self, ids: PeerIdRegistry) -> Self {
        self.ids = Arc::new(ids);
        self
    }

    pub fn on_start(&self) {
        self.shutdown.send_replace(false);
        if !self.config.broadcast {
            info!("Tx broadcasting is disabled");
        }
        info!(
            broadcast = self.config.broadcast,
            max_tx_bytes = self.config.max_tx_bytes,
            "Mempool reactor started"
        );
    }

    /// Signals every broadcast routine to exit.
    pub fn on_stop(&self) {
        self.shutdown.send_replace(true);
        info!("Mempool reactor stopped");
    }

    pub fn is_running(&self) -> bool {
        !*self.shutdown.borrow()
    }

    pub fn config(&self) -> &ReactorConfig {
        &self.config
    }

    pub fn sender_table(&self) -> &SenderTable {
        &self.senders
    }

    pub fn peer_ids(&self) -> &PeerIdRegistry {
        &self.ids
    }

    /// Decodes a raw channel payload and handles it like `receive`.
    ///
    /// Bytes that do not decode are a protocol violation and stop the peer.
    pub fn receive_bytes(&self, src: NodeId, channel_id: u8, bytes: &[u8]) {
        match MempoolMessage::decode(bytes) {
            Ok(message) => self.receive(Envelope {
                src,
                channel_id,
                message,
            }),
            Err(e) => {
                error!(peer = %src, channel = channel_id, error = %e, "Undecodable mempool message");
                self.switch.stop_peer_for_error(&src, e);
            }
        }
    }

    fn receive_txs(&self, src: NodeId, batch: Txs) {
        if batch.txs.is_empty() {
            error!(peer = %src, error = %ReactorError::EmptyTxs, "Received empty txs from peer");
            return;
        }

        for raw in batch.txs {
            let tx = Tx::new(raw);
            let key = tx.key();

            match self.mempool.check_tx(tx) {
                Err(MempoolError::TxInCache) => {
                    debug!(peer = %src, tx = %shared_types::short_hex(&key), "Tx already exists in cache");
                }
                Err(e) => {
                    info!(peer = %src, tx = %shared_types::short_hex(&key), error = %e, "Could not check tx");
                }
                Ok(handle) => {
                    let ids = Arc::clone(&self.ids);
                    let senders = Arc::clone(&self.senders);
                    let mempool = Arc::clone(&self.mempool);
                    tokio::spawn(async move {
                        let Some(response) = handle.response().await else {
                            return;
                        };
                        if !response.is_ok() {
                            debug!(
                                tx = %shared_types::short_hex(&key),
                                code = response.code,
                                log = %response.log,
                                "Tx rejected by validation"
                            );
                            return;
                        }

                        // Resolved now: the peer may have left during validation
                        // and its id gone to someone else.
                        let sender = ids.get_for_peer(&src);
                        if sender == UNKNOWN_PEER_ID {
                            return;
                        }
                        senders.add_sender(key, sender);

                        // The pool may have dropped the tx before the sender was
                        // recorded, in which case its removal callback already ran.
                        if !mempool.contains(&key) {
                            senders.remove_all(&key);
                        }
                    });
                }
            }
        }
    }
}

impl<M, S> Reactor for MempoolReactor<M, S>
where
    M: Mempool,
    S: PeerSwitch,
{
    fn channels(&self) -> Result<Vec<ChannelDescriptor>, ReactorError> {
        Ok(vec![ChannelDescriptor::mempool(self.config.max_tx_bytes)?])
    }

    fn init_peer(&self, peer: &dyn Peer) -> Result<(), ReactorError> {
        let id = peer.id();
        self.ids.reserve_for_peer(&id).map_err(|e| {
            warn!(peer = %id, error = %e, "Could not reserve peer id");
            e
        })
    }

    fn add_peer(&self, peer: Arc<dyn Peer>) -> Option<JoinHandle<()>> {
        if !self.config.broadcast {
            return None;
        }

        let node = peer.id();
        let peer_id = self.ids.get_for_peer(&node);
        if peer_id == UNKNOWN_PEER_ID {
            warn!(peer = %node, "Peer has no id; not gossiping to it");
            return None;
        }

        let routine = BroadcastRoutine::new(
            peer,
            peer_id,
            Arc::clone(&self.senders),
            self.mempool.new_iterator(),
            self.shutdown.subscribe(),
            self.config.peer_catchup_sleep_interval,
        );

        debug!(peer = %node, peer_id, "Starting tx broadcast");
        Some(tokio::spawn(
            routine
                .run()
                .instrument(info_span!("broadcast_tx", peer = %node, peer_id)),
        ))
    }

    fn remove_peer(&self, peer: &dyn Peer) {
        let id = peer.id();
        self.ids.reclaim(&id);
        debug!(peer = %id, "Peer removed");
    }

    fn receive(&self, envelope: Envelope) {
        let Envelope { src, message, .. } = envelope;
        match message {
            MempoolMessage::Txs(batch) => self.receive_txs(src, batch),
            other => {
                let e = ReactorError::UnknownMessage {
                    kind: other.kind().to_string(),
                };
                error!(peer = %src, error = %e, "Unknown message on mempool channel");
                self.switch.stop_peer_for_error(&src, e);
            }
        }
    }
}
