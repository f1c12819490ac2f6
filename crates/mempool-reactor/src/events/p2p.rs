//! P2P message types carried on the mempool channel.
//!
//! The wire form is bincode over the serde derives below. The transport owns
//! framing; this module only fixes what a mempool message is and how large
//! one can get.

use serde::{Deserialize, Serialize};
use shared_types::NodeId;

use crate::domain::{ReactorError, Tx};

/// Channel id of the mempool gossip channel.
pub const MEMPOOL_CHANNEL: u8 = 0x30;

/// Send priority of the mempool channel relative to other reactors' channels.
pub const MEMPOOL_CHANNEL_PRIORITY: u8 = 5;

/// A batch of raw transactions.
///
/// Inbound batches must be non-empty. Outbound batches from this node always
/// hold exactly one transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Txs {
    pub txs: Vec<Vec<u8>>,
}

/// Messages that can appear on the mempool channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MempoolMessage {
    /// Transactions to admit.
    Txs(Txs),
    /// A message type this channel does not handle. Receiving one is a
    /// protocol violation that terminates the connection.
    Unknown { kind: String },
}

impl MempoolMessage {
    /// Wraps one transaction, the only shape this node sends.
    pub fn single(tx: &Tx) -> Self {
        Self::Txs(Txs {
            txs: vec![tx.as_bytes().to_vec()],
        })
    }

    /// Message type name for logs and errors.
    pub fn kind(&self) -> &str {
        match self {
            Self::Txs(_) => "Txs",
            Self::Unknown { kind } => kind,
        }
    }

    /// Encodes the message to its wire form.
    pub fn encode(&self) -> Result<Vec<u8>, ReactorError> {
        bincode::serialize(self).map_err(|e| ReactorError::Encode(e.to_string()))
    }

    /// Decodes a message from its wire form.
    pub fn decode(bytes: &[u8]) -> Result<Self, ReactorError> {
        bincode::deserialize(bytes).map_err(|e| ReactorError::Decode(e.to_string()))
    }

    /// Size of the wire form in bytes.
    pub fn encoded_len(&self) -> Result<usize, ReactorError> {
        bincode::serialized_size(self)
            .map(|n| n as usize)
            .map_err(|e| ReactorError::Encode(e.to_string()))
    }
}

/// Channel registration handed to the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelDescriptor {
    pub id: u8,
    pub priority: u8,
    /// Largest message the transport should accept on this channel.
    pub recv_message_capacity: usize,
}

impl ChannelDescriptor {
    /// Descriptor for the mempool channel.
    ///
    /// Capacity is the encoded size of a batch holding one transaction of
    /// `max_tx_bytes` bytes. Length prefixes are fixed width, so the framing
    /// is measured on an empty transaction.
    pub fn mempool(max_tx_bytes: usize) -> Result<Self, ReactorError> {
        let framing = MempoolMessage::Txs(Txs {
            txs: vec![Vec::new()],
        })
        .encoded_len()?;
        Ok(Self {
            id: MEMPOOL_CHANNEL,
            priority: MEMPOOL_CHANNEL_PRIORITY,
            recv_message_capacity: framing + max_tx_bytes,
        })
    }
}

/// A message delivered on a channel, tagged with the peer that sent it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    pub src: NodeId,
    pub channel_id: u8,
    pub message: MempoolMessage,
}

impl Envelope {
    pub fn new(src: NodeId, message: MempoolMessage) -> Self {
        Self {
            src,
            channel_id: MEMPOOL_CHANNEL,
            message,
        }
    }
}
