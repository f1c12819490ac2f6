//! # Node Runtime Library
//!
//! Exposes the runtime's building blocks for the binary and the
//! integration tests.
//!
//! - `config` - `NodeConfig` loaded from `GOSSIP_*` environment variables
//! - `network` - a fully connected local network of mempool reactors

pub mod config;
pub mod network;

pub use config::{ConfigError, NodeConfig, SimulationConfig};
pub use network::{LocalNetwork, Node, NodeMempool, NodeReactor};
