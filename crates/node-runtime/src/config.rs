//! # Node Configuration
//!
//! Defaults overridden by environment variables.
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `GOSSIP_BROADCAST` | `reactor.broadcast` | `true` |
//! | `GOSSIP_MAX_TX_BYTES` | `reactor.max_tx_bytes` | 1 MiB |
//! | `GOSSIP_PEER_CATCHUP_SLEEP_MS` | `reactor.peer_catchup_sleep_interval` | 100 |
//! | `GOSSIP_NODES` | `simulation.nodes` | 4 |
//! | `GOSSIP_TXS` | `simulation.txs` | 100 |
//! | `GOSSIP_TX_SIZE` | `simulation.tx_size` | 64 |
//! | `GOSSIP_POOL_SIZE` | `simulation.pool_size` | 5000 |
//! | `GOSSIP_CACHE_SIZE` | `simulation.cache_size` | 10000 |
//! | `GOSSIP_PEER_QUEUE` | `simulation.peer_queue_capacity` | 256 |
//! | `GOSSIP_CHECK_TX_DELAY_MS` | `simulation.check_tx_delay` | 0 |
//! | `GOSSIP_CONVERGENCE_TIMEOUT_SECS` | `simulation.convergence_timeout` | 10 |

use mempool_reactor::adapters::PoolConfig;
use mempool_reactor::ReactorConfig;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?} ({reason})")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("{var} must be at least {min}")]
    TooSmall { var: &'static str, min: u64 },
}

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeConfig {
    /// Settings of every node's reactor.
    pub reactor: ReactorConfig,
    /// Network shape and workload.
    pub simulation: SimulationConfig,
}

/// Shape of the simulated network and the workload driven through it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationConfig {
    /// Number of nodes, fully connected.
    pub nodes: usize,
    /// Transactions submitted before the first block.
    pub txs: usize,
    /// Payload size of each generated transaction.
    pub tx_size: usize,
    /// Per-node pool capacity.
    pub pool_size: usize,
    /// Per-node seen-cache capacity.
    pub cache_size: usize,
    /// Outbound queue length of each connection.
    pub peer_queue_capacity: usize,
    /// Artificial validation latency.
    pub check_tx_delay: Duration,
    /// How long to wait for every pool to hold every transaction.
    pub convergence_timeout: Duration,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            nodes: 4,
            txs: 100,
            tx_size: 64,
            pool_size: 5000,
            cache_size: 10_000,
            peer_queue_capacity: 256,
            check_tx_delay: Duration::ZERO,
            convergence_timeout: Duration::from_secs(10),
        }
    }
}

impl NodeConfig {
    /// Loads defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Loads defaults overridden by `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let reactor = &mut config.reactor;
        let sim = &mut config.simulation;

        if let Some(v) = parse(&lookup, "GOSSIP_BROADCAST")? {
            reactor.broadcast = v;
        }
        if let Some(v) = parse(&lookup, "GOSSIP_MAX_TX_BYTES")? {
            reactor.max_tx_bytes = v;
        }
        if let Some(ms) = parse::<u64, _>(&lookup, "GOSSIP_PEER_CATCHUP_SLEEP_MS")? {
            reactor.peer_catchup_sleep_interval = Duration::from_millis(ms);
        }
        if let Some(v) = parse(&lookup, "GOSSIP_NODES")? {
            sim.nodes = v;
        }
        if let Some(v) = parse(&lookup, "GOSSIP_TXS")? {
            sim.txs = v;
        }
        if let Some(v) = parse(&lookup, "GOSSIP_TX_SIZE")? {
            sim.tx_size = v;
        }
        if let Some(v) = parse(&lookup, "GOSSIP_POOL_SIZE")? {
            sim.pool_size = v;
        }
        if let Some(v) = parse(&lookup, "GOSSIP_CACHE_SIZE")? {
            sim.cache_size = v;
        }
        if let Some(v) = parse(&lookup, "GOSSIP_PEER_QUEUE")? {
            sim.peer_queue_capacity = v;
        }
        if let Some(ms) = parse::<u64, _>(&lookup, "GOSSIP_CHECK_TX_DELAY_MS")? {
            sim.check_tx_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = parse::<u64, _>(&lookup, "GOSSIP_CONVERGENCE_TIMEOUT_SECS")? {
            sim.convergence_timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks: [(&'static str, usize, u64); 4] = [
            ("GOSSIP_NODES", self.simulation.nodes, 1),
            ("GOSSIP_TX_SIZE", self.simulation.tx_size, 1),
            ("GOSSIP_PEER_QUEUE", self.simulation.peer_queue_capacity, 1),
            ("GOSSIP_MAX_TX_BYTES", self.reactor.max_tx_bytes, 1),
        ];
        for (var, value, min) in checks {
            if (value as u64) < min {
                return Err(ConfigError::TooSmall { var, min });
            }
        }
        if self.simulation.tx_size > self.reactor.max_tx_bytes {
            return Err(ConfigError::InvalidValue {
                var: "GOSSIP_TX_SIZE",
                value: self.simulation.tx_size.to_string(),
                reason: format!("exceeds max tx bytes {}", self.reactor.max_tx_bytes),
            });
        }
        Ok(())
    }

    /// Pool limits derived from this configuration.
    pub fn pool(&self) -> PoolConfig {
        PoolConfig {
            size: self.simulation.pool_size,
            max_tx_bytes: self.reactor.max_tx_bytes,
            cache_size: self.simulation.cache_size,
        }
    }
}

fn parse<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            var,
            value: raw.clone(),
            reason: e.to_string(),
        })
}
