//! # Domain Layer for the Mempool Reactor
//!
//! Synchronous building blocks with no I/O. The async parts (broadcast loop,
//! admission continuations) live in `service.rs` and `broadcast.rs`.
//!
//! ## Contents
//!
//! - **entities**: `Tx`, `TxKey`, `Entry`, `SenderId`
//! - **peer_ids**: `PeerIdRegistry` (NodeId → compact sender id)
//! - **senders**: `SenderTable` (TxKey → set of sender ids)
//! - **config**: `ReactorConfig`
//! - **errors**: `ReactorError`, `MempoolError`

mod config;
mod entities;
mod errors;
mod peer_ids;
mod senders;

pub use config::*;
pub use entities::*;
pub use errors::*;
pub use peer_ids::*;
pub use senders::*;
