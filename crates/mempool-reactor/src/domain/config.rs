//! Reactor configuration.

use std::time::Duration;

/// Default maximum size of a single transaction (1 MiB).
pub const DEFAULT_MAX_TX_BYTES: usize = 1024 * 1024;

/// Default pause before re-checking a lagging peer or retrying a failed send.
pub const DEFAULT_PEER_CATCHUP_SLEEP_INTERVAL: Duration = Duration::from_millis(100);

/// Configuration consumed by the mempool reactor.
///
/// Loading is the embedding process's job; this is only the surface the
/// reactor reads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReactorConfig {
    /// Start a broadcast routine for every added peer.
    pub broadcast: bool,
    /// Largest transaction accepted; sizes the channel's receive capacity.
    pub max_tx_bytes: usize,
    /// Sleep between re-checks of a lagging peer and between send retries.
    pub peer_catchup_sleep_interval: Duration,
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self {
            broadcast: true,
            max_tx_bytes: DEFAULT_MAX_TX_BYTES,
            peer_catchup_sleep_interval: DEFAULT_PEER_CATCHUP_SLEEP_INTERVAL,
        }
    }
}
