//! Ports layer for the mempool reactor.
//!
//! - Inbound (driving): what the transport calls on the reactor
//! - Outbound (driven): the pending pool, connected peers and the switch

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
