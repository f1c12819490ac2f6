//! # Core Entities
//!
//! - [`Hash`]: 32-byte content digest
//! - [`NodeId`]: transport-level identifier of a connected node

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 32-byte hash (SHA-256).
pub type Hash = [u8; 32];

/// Number of leading bytes rendered by the short hex form used in logs.
const SHORT_HEX_BYTES: usize = 6;

/// Unique identifier for a node in the network.
///
/// Derived by the transport from the node's public key. Tables that need a
/// compact key (e.g. per-transaction sender sets) map it to a small integer
/// instead of storing all 32 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct NodeId(pub [u8; 32]);

impl NodeId {
    /// Creates a node id from raw bytes.
    pub fn new(id: [u8; 32]) -> Self {
        Self(id)
    }

    /// Builds a node id whose first eight bytes hold `n` (little-endian),
    /// so small indices stay distinct in the short display form.
    pub fn from_index(n: u64) -> Self {
        let mut id = [0u8; 32];
        id[..8].copy_from_slice(&n.to_le_bytes());
        Self(id)
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&short_hex(&self.0))
    }
}

/// Renders the leading bytes of a digest as lowercase hex.
pub fn short_hex(bytes: &[u8]) -> String {
    hex::encode(&bytes[..bytes.len().min(SHORT_HEX_BYTES)])
}
