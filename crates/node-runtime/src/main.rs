//! # Mempool Gossip Node Runtime
//!
//! Drives a local network of mempool reactors end to end.
//!
//! ## Run Sequence
//!
//! 1. Load configuration (defaults + `GOSSIP_*` environment)
//! 2. Start N fully connected nodes
//! 3. Submit random transactions round-robin across nodes
//! 4. Wait until every pool holds every transaction
//! 5. Commit a block on every node; pools and sender tables drain
//! 6. Shut down (also on Ctrl+C)

use anyhow::{bail, Context, Result};
use rand::RngCore;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mempool_reactor::{MempoolError, Tx, TxKey};
use node_runtime::{LocalNetwork, NodeConfig};

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Failed to build log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("Failed to install tracing subscriber")
}

fn random_txs(count: usize, size: usize) -> Vec<Tx> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|_| {
            let mut bytes = vec![0u8; size];
            rng.fill_bytes(&mut bytes);
            Tx::new(bytes)
        })
        .collect()
}

async fn run(network: &LocalNetwork, config: &NodeConfig) -> Result<()> {
    let sim = &config.simulation;
    let txs = random_txs(sim.txs, sim.tx_size);
    let keys: Vec<TxKey> = txs.iter().map(Tx::key).collect();

    for (i, tx) in txs.into_iter().enumerate() {
        match network.submit(i % network.len(), tx) {
            Ok(_) | Err(MempoolError::TxInCache) => {}
            Err(e) => warn!(error = %e, "Submission rejected"),
        }
    }
    info!(txs = keys.len(), "Transactions submitted");

    if !config.reactor.broadcast {
        info!("Broadcast disabled; skipping convergence");
        return Ok(());
    }

    if !network
        .wait_for_convergence(&keys, sim.convergence_timeout)
        .await
    {
        bail!(
            "pools did not converge within {:?}",
            sim.convergence_timeout
        );
    }
    for node in network.nodes() {
        info!(
            node = %node.id,
            pool = node.mempool.size(),
            tracked = node.reactor.sender_table().len(),
            "Pool converged"
        );
    }

    let block = network.commit_block(1, keys.len());
    for node in network.nodes() {
        info!(
            node = %node.id,
            committed = block.len(),
            pool = node.mempool.size(),
            tracked = node.reactor.sender_table().len(),
            "Pool after block"
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    let config = NodeConfig::from_env().context("Failed to load configuration")?;
    info!(
        nodes = config.simulation.nodes,
        txs = config.simulation.txs,
        broadcast = config.reactor.broadcast,
        "Starting mempool gossip network"
    );

    let network = LocalNetwork::start(&config);

    let outcome = tokio::select! {
        result = run(&network, &config) => result,
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl+C")?;
            info!("Interrupted");
            Ok(())
        }
    };

    network.shutdown().await;
    outcome
}
