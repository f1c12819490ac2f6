//! # Local Network
//!
//! A fully connected set of nodes wired over [`ChannelPeer`]s.
//!
//! ```text
//!   node A                                         node B
//!  ┌─────────┐  a→b ChannelPeer   forwarder task  ┌─────────┐
//!  │ reactor │ ──try_send──→ [mpsc] ──receive()──→ │ reactor │
//!  │         │ ←──receive()── [mpsc] ←──try_send── │         │
//!  └─────────┘  forwarder task    b→a ChannelPeer  └─────────┘
//! ```
//!
//! Each direction of a connection is its own `ChannelPeer`, owned by the
//! sending node's switch. The forwarder of a direction ends when that peer
//! quits and then removes the peer from the sending node's reactor.

use mempool_reactor::adapters::{
    AcceptAll, ChannelPeer, DelayedValidator, InMemoryMempool, InMemorySwitch,
};
use mempool_reactor::{
    CheckTxHandle, Envelope, Mempool, MempoolError, MempoolReactor, Peer, Reactor, Tx, TxKey,
};
use shared_types::NodeId;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::NodeConfig;

pub type NodeMempool = InMemoryMempool<DelayedValidator<AcceptAll>>;
pub type NodeReactor = MempoolReactor<NodeMempool, InMemorySwitch>;

/// One simulated node.
pub struct Node {
    pub id: NodeId,
    pub mempool: Arc<NodeMempool>,
    pub switch: Arc<InMemorySwitch>,
    pub reactor: Arc<NodeReactor>,
}

impl Node {
    fn new(index: usize, config: &NodeConfig) -> Self {
        let id = NodeId::from_index(index as u64 + 1);
        let validator = DelayedValidator::new(AcceptAll, config.simulation.check_tx_delay);
        let mempool = Arc::new(InMemoryMempool::new(config.pool(), validator));
        let switch = Arc::new(InMemorySwitch::new());
        let reactor = Arc::new(MempoolReactor::new(
            config.reactor.clone(),
            Arc::clone(&mempool),
            Arc::clone(&switch),
        ));
        reactor.on_start();
        Self {
            id,
            mempool,
            switch,
            reactor,
        }
    }
}

/// One direction of a connection.
struct Link {
    from: usize,
    to: usize,
    peer: Arc<ChannelPeer>,
}

/// Nodes plus the tasks moving messages between them.
pub struct LocalNetwork {
    nodes: Vec<Node>,
    links: Vec<Link>,
    tasks: Vec<JoinHandle<()>>,
    queue_capacity: usize,
}

impl LocalNetwork {
    /// Creates `config.simulation.nodes` nodes and connects every pair.
    pub fn start(config: &NodeConfig) -> Self {
        let nodes = (0..config.simulation.nodes)
            .map(|i| Node::new(i, config))
            .collect();
        let mut network = Self {
            nodes,
            links: Vec::new(),
            tasks: Vec::new(),
            queue_capacity: config.simulation.peer_queue_capacity,
        };

        let n = network.nodes.len();
        for a in 0..n {
            for b in (a + 1)..n {
                network.connect(a, b);
            }
        }

        info!(nodes = n, links = network.links.len(), "Local network started");
        network
    }

    /// Connects `a` and `b` in both directions.
    pub fn connect(&mut self, a: usize, b: usize) {
        self.open(a, b);
        self.open(b, a);
    }

    fn open(&mut self, from: usize, to: usize) {
        let (owner, target) = (&self.nodes[from], &self.nodes[to]);
        let (peer, rx) = ChannelPeer::new(owner.id, target.id, self.queue_capacity);

        owner.switch.register(Arc::clone(&peer));
        if let Err(e) = owner.reactor.init_peer(&*peer) {
            warn!(from = %owner.id, to = %target.id, error = %e, "Peer init failed");
        }
        peer.set_height(target.mempool.height());

        self.tasks.push(tokio::spawn(forward(
            rx,
            Arc::clone(&peer),
            Arc::clone(&owner.reactor),
            Arc::clone(&target.reactor),
        )));
        if let Some(handle) = owner.reactor.add_peer(peer.clone()) {
            self.tasks.push(handle);
        }

        self.links.push(Link { from, to, peer });
    }

    /// Stops both directions between `a` and `b`.
    pub fn disconnect(&mut self, a: usize, b: usize) {
        for link in &self.links {
            if (link.from == a && link.to == b) || (link.from == b && link.to == a) {
                link.peer.stop();
            }
        }
        self.links
            .retain(|l| !((l.from == a && l.to == b) || (l.from == b && l.to == a)));
    }

    pub fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The connection `from → to`, if open.
    pub fn peer(&self, from: usize, to: usize) -> Option<Arc<ChannelPeer>> {
        self.links
            .iter()
            .find(|l| l.from == from && l.to == to)
            .map(|l| Arc::clone(&l.peer))
    }

    /// Submits a transaction at `node` as if from a local client.
    pub fn submit(&self, node: usize, tx: Tx) -> Result<CheckTxHandle, MempoolError> {
        self.nodes[node].mempool.check_tx(tx)
    }

    /// True when every node's pool holds every key.
    pub fn converged(&self, keys: &[TxKey]) -> bool {
        self.nodes
            .iter()
            .all(|node| keys.iter().all(|key| node.mempool.contains(key)))
    }

    /// Polls until `converged(keys)` or `timeout` elapses.
    pub async fn wait_for_convergence(&self, keys: &[TxKey], timeout: Duration) -> bool {
        let poll = async {
            while !self.converged(keys) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        };
        tokio::time::timeout(timeout, poll).await.is_ok()
    }

    /// Commits a block of up to `max_txs` from node 0's pool on every node
    /// and advances every peer's reported height.
    pub fn commit_block(&self, height: i64, max_txs: usize) -> Vec<Tx> {
        let block = self
            .nodes
            .first()
            .map(|n| n.mempool.reap(max_txs))
            .unwrap_or_default();
        for node in &self.nodes {
            node.mempool.update(height, &block);
        }
        for link in &self.links {
            link.peer.set_height(height);
        }
        info!(height, txs = block.len(), "Block committed");
        block
    }

    /// Stops every reactor and connection and waits for their tasks.
    pub async fn shutdown(self) {
        for node in &self.nodes {
            node.mempool.close();
            node.reactor.on_stop();
        }
        for link in &self.links {
            link.peer.stop();
        }
        for task in self.tasks {
            let _ = task.await;
        }
        info!("Local network stopped");
    }
}

/// Delivers messages sent on `peer` to `target` until the peer quits, then
/// detaches the peer from `owner`.
async fn forward(
    mut rx: mpsc::Receiver<Envelope>,
    peer: Arc<ChannelPeer>,
    owner: Arc<NodeReactor>,
    target: Arc<NodeReactor>,
) {
    let mut quit = peer.quit();
    loop {
        tokio::select! {
            msg = rx.recv() => match msg {
                Some(envelope) => target.receive(envelope),
                None => break,
            },
            _ = signalled(&mut quit) => break,
        }
    }
    owner.remove_peer(&*peer);
    debug!(from = %peer.local(), to = %peer.id(), "Forwarder stopped");
}

async fn signalled(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|set| *set).await;
}
