//! # Core Domain Entities
//!
//! - [`Tx`]: opaque transaction bytes
//! - [`TxKey`]: SHA-256 of the transaction bytes
//! - [`Entry`]: a transaction resident in the pending pool
//! - [`SenderId`]: compact per-connection peer id

use sha2::{Digest, Sha256};
use shared_types::{short_hex, Hash};
use std::fmt;

/// Content fingerprint of a transaction.
pub type TxKey = Hash;

/// Compact peer id stored in sender sets instead of the 32-byte `NodeId`.
pub type SenderId = u16;

/// Reserved id meaning "self" or "unset". Never assigned to a remote peer.
pub const UNKNOWN_PEER_ID: SenderId = 0;

/// Largest number of peer ids that can be active at once.
pub const MAX_ACTIVE_IDS: SenderId = u16::MAX;

/// Raw transaction bytes. The reactor never looks inside.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Tx(Vec<u8>);

impl Tx {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Computes the transaction key (SHA-256 of the raw bytes).
    pub fn key(&self) -> TxKey {
        Sha256::digest(&self.0).into()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Tx {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Tx {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl fmt::Display for Tx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tx{{{}}}", short_hex(&self.key()))
    }
}

impl fmt::Debug for Tx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tx({} bytes, {})", self.0.len(), short_hex(&self.key()))
    }
}

/// A transaction currently resident in the pending pool.
///
/// The key is computed once on admission. `height` is the block height the
/// pool was at when the transaction was admitted; the broadcast loop compares
/// it with the peer's reported height to decide whether the peer is lagging.
#[derive(Clone, Debug)]
pub struct Entry {
    tx: Tx,
    key: TxKey,
    height: i64,
}

impl Entry {
    pub fn new(tx: Tx, height: i64) -> Self {
        let key = tx.key();
        Self { tx, key, height }
    }

    pub fn tx(&self) -> &Tx {
        &self.tx
    }

    pub fn key(&self) -> &TxKey {
        &self.key
    }

    /// Block height at which the transaction entered the pool.
    pub fn height(&self) -> i64 {
        self.height
    }
}
