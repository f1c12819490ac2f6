//! # Adapters
//!
//! In-memory implementations of the outbound ports, used by the node runtime
//! and the integration tests.

pub mod peer;
pub mod pool;
pub mod switch;
pub mod validator;

pub use peer::{ChannelPeer, HeightState};
pub use pool::{InMemoryMempool, PoolConfig, PoolIterator, TxCache, CODE_TYPE_POOL_FULL};
pub use switch::InMemorySwitch;
pub use validator::{AcceptAll, DelayedValidator, RejectMatching, CODE_TYPE_REJECTED};
