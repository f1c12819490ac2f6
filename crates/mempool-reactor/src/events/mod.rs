//! Wire messages for the mempool gossip channel.

pub mod p2p;

pub use p2p::*;
