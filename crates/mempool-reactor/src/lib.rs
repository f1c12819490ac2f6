//! # Mempool Gossip Reactor
//!
//! Relays transactions that this node accepted into its pending pool to every
//! connected peer, and admits transactions received from peers into the pool.
//!
//! ## Architecture Role
//!
//! ```text
//!                 ┌──────────────────── MempoolReactor ────────────────────┐
//!  peer joins ──→ │ PeerIdRegistry ──→ BroadcastRoutine (one task per peer) │ ──try_send──→ [Peer]
//!                 │                          ↑ EntryIterator               │
//!  Txs msg ─────→ │ receive() ──check_tx──→ [Mempool] ──removed cb──┐      │
//!                 │      └── on CODE_TYPE_OK ──→ SenderTable ←──────┘      │
//!                 └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | No send to a recorded sender | `broadcast.rs` - `BroadcastRoutine::offer()` |
//! | Sender sets die with the pool entry | `service.rs` - removal callback in `MempoolReactor::new()` |
//! | Peer ids unique among connected peers | `domain/peer_ids.rs` - `reserve_for_peer()` |
//! | Lagging peers are not flooded | `broadcast.rs` - height check in `offer()` |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! adapters/  - in-memory pool, validators, channel peers, switch
//! ports/     - Reactor (inbound), Mempool/EntryIterator/Peer/PeerSwitch (outbound)
//! events/    - wire messages and channel descriptor
//! domain/    - Tx, Entry, PeerIdRegistry, SenderTable, config, errors
//! service.rs / broadcast.rs - reactor lifecycle, inbound handler, broadcast loop
//! ```

pub mod adapters;
pub mod broadcast;
pub mod domain;
pub mod events;
pub mod ports;
pub mod service;

pub use domain::*;
pub use events::{ChannelDescriptor, Envelope, MempoolMessage, Txs, MEMPOOL_CHANNEL};
pub use ports::inbound::Reactor;
pub use ports::outbound::{
    CheckTxHandle, CheckTxResponse, EntryIterator, Mempool, Peer, PeerState, PeerSwitch,
    TxRemovedCallback, TxValidator, CODE_TYPE_OK,
};
pub use service::MempoolReactor;
