//! Reactor and pool error types.

use thiserror::Error;

/// Errors raised by the reactor itself.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReactorError {
    /// Every peer id in `[1, max]` is held by a connected peer.
    #[error("no free peer ids: all {max} ids are in use")]
    NoFreePeerIds { max: u16 },

    /// A message type the mempool channel does not carry.
    #[error("mempool cannot handle message of type: {kind}")]
    UnknownMessage { kind: String },

    /// A `Txs` message with no transactions.
    #[error("received empty txs")]
    EmptyTxs,

    /// Bytes on the mempool channel that are not a mempool message.
    #[error("failed to decode mempool message: {0}")]
    Decode(String),

    #[error("failed to encode mempool message: {0}")]
    Encode(String),
}

/// Admission errors reported synchronously by the pending pool.
///
/// Validation failures are not errors: they arrive later as a non-OK
/// `CheckTxResponse`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MempoolError {
    /// The transaction was seen recently (pool or cache).
    #[error("tx already exists in cache")]
    TxInCache,

    #[error("tx too large: {size} bytes (max: {max})")]
    TxTooLarge { size: usize, max: usize },

    #[error("mempool is full: {capacity} txs")]
    MempoolIsFull { capacity: usize },

    /// The pool no longer accepts work.
    #[error("mempool closed")]
    Closed,
}
