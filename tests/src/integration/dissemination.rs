//! # Dissemination Flows
//!
//! - every connected, caught-up peer eventually receives every entry
//! - a peer recorded as a sender never gets the transaction back
//! - lagging peers receive nothing newer than their height + 1
//! - sender sets disappear with their pool entries

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use mempool_reactor::{Mempool, Reactor, TxKey};
    use node_runtime::{LocalNetwork, NodeConfig};

    use crate::integration::fixtures::{drain_txs, eventually, random_tx, Harness};

    fn network_config(nodes: usize) -> NodeConfig {
        let mut config = NodeConfig::default();
        config.simulation.nodes = nodes;
        config.reactor.peer_catchup_sleep_interval = Duration::from_millis(10);
        config
    }

    // =========================================================================
    // EVENTUAL DISSEMINATION
    // =========================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_every_pool_converges_on_mesh() {
        let network = LocalNetwork::start(&network_config(4));

        let txs: Vec<_> = (0..50).map(|_| random_tx(32)).collect();
        let keys: Vec<TxKey> = txs.iter().map(|t| t.key()).collect();
        for (i, tx) in txs.into_iter().enumerate() {
            network.submit(i % network.len(), tx).expect("admitted");
        }

        assert!(
            network
                .wait_for_convergence(&keys, Duration::from_secs(10))
                .await,
            "every node should hold every tx"
        );
        for node in network.nodes() {
            assert_eq!(node.mempool.size(), keys.len());
        }

        network.shutdown().await;
    }

    #[tokio::test]
    async fn test_peer_added_late_receives_backlog() {
        let harness = Harness::fast();
        let txs: Vec<_> = (0..5).map(|_| random_tx(16)).collect();
        for tx in &txs {
            harness.submit(tx.clone()).await;
        }

        let (peer, mut rx) = harness.connect(1);
        harness.reactor.add_peer(peer).expect("broadcast task");

        let received = drain_txs(&mut rx, Duration::from_millis(200)).await;
        assert_eq!(received, txs, "pool order, each tx once");
    }

    // =========================================================================
    // NO REDUNDANT SEND
    // =========================================================================

    #[tokio::test]
    async fn test_tx_is_not_echoed_to_its_sender() {
        let harness = Harness::fast();
        let (peer, mut rx) = harness.connect(1);

        let from_peer = random_tx(16);
        harness.deliver(1, &[from_peer.clone()]);
        let sender_id = harness.reactor.peer_ids().get_for_peer(&peer_node(1));
        assert!(
            eventually(Duration::from_secs(1), || harness
                .reactor
                .sender_table()
                .is_sender(&from_peer.key(), sender_id))
            .await
        );

        let local = random_tx(16);
        harness.submit(local.clone()).await;

        harness.reactor.add_peer(peer).expect("broadcast task");

        let received = drain_txs(&mut rx, Duration::from_millis(200)).await;
        assert_eq!(received, vec![local]);
    }

    #[tokio::test]
    async fn test_sender_gets_nothing_while_other_peer_gets_everything() {
        let harness = Harness::fast();
        let (sender, mut sender_rx) = harness.connect(1);
        let (other, mut other_rx) = harness.connect(2);

        let txs: Vec<_> = (0..4).map(|_| random_tx(16)).collect();
        harness.deliver(1, &txs);
        let sender_id = harness.reactor.peer_ids().get_for_peer(&peer_node(1));
        assert!(
            eventually(Duration::from_secs(1), || txs.iter().all(|t| harness
                .reactor
                .sender_table()
                .is_sender(&t.key(), sender_id)))
            .await
        );

        harness.reactor.add_peer(sender).expect("broadcast task");
        harness.reactor.add_peer(other).expect("broadcast task");

        assert!(drain_txs(&mut sender_rx, Duration::from_millis(150))
            .await
            .is_empty());
        let to_other: HashSet<_> = drain_txs(&mut other_rx, Duration::from_millis(150))
            .await
            .iter()
            .map(|t| t.key())
            .collect();
        let expected: HashSet<_> = txs.iter().map(|t| t.key()).collect();
        assert_eq!(to_other, expected);
    }

    // =========================================================================
    // CATCH-UP THROTTLING
    // =========================================================================

    #[tokio::test]
    async fn test_lagging_peer_is_throttled_until_caught_up() {
        let harness = Harness::fast();
        harness.mempool.update(5, &[]);

        let tx = random_tx(16);
        harness.submit(tx.clone()).await;

        let (peer, mut rx) = harness.connect(1);
        peer.set_height(3);
        harness.reactor.add_peer(peer.clone()).expect("broadcast task");

        // Entry height 5 needs the peer at 4 or above.
        assert!(drain_txs(&mut rx, Duration::from_millis(100)).await.is_empty());

        peer.set_height(4);
        let received = drain_txs(&mut rx, Duration::from_millis(200)).await;
        assert_eq!(received, vec![tx]);
    }

    #[tokio::test]
    async fn test_peer_without_height_is_throttled() {
        let harness = Harness::fast();
        let tx = random_tx(16);
        harness.submit(tx.clone()).await;

        // Fresh peer with no reported state.
        let (peer, mut rx) = mempool_reactor::adapters::ChannelPeer::new(
            harness.id,
            peer_node(7),
            16,
        );
        harness.reactor.init_peer(&*peer).expect("peer id");
        harness.reactor.add_peer(peer.clone()).expect("broadcast task");

        assert!(drain_txs(&mut rx, Duration::from_millis(100)).await.is_empty());

        peer.set_height(0);
        assert_eq!(drain_txs(&mut rx, Duration::from_millis(200)).await, vec![tx]);
    }

    #[tokio::test]
    async fn test_full_queue_delays_but_does_not_drop() {
        let harness = Harness::fast();
        let (peer, mut rx) = mempool_reactor::adapters::ChannelPeer::new(
            harness.id,
            peer_node(1),
            1,
        );
        harness.reactor.init_peer(&*peer).expect("peer id");
        peer.set_height(0);

        let txs: Vec<_> = (0..5).map(|_| random_tx(16)).collect();
        for tx in &txs {
            harness.submit(tx.clone()).await;
        }
        harness.reactor.add_peer(peer).expect("broadcast task");

        // Queue of one: read slowly and still get every tx in order.
        let mut received = Vec::new();
        for _ in 0..txs.len() {
            received.extend(drain_txs(&mut rx, Duration::from_millis(60)).await);
        }
        assert_eq!(received, txs);
    }

    // =========================================================================
    // TRACKING CLEANUP
    // =========================================================================

    #[tokio::test]
    async fn test_sender_sets_cleared_on_removal() {
        let harness = Harness::fast();
        let _conn = harness.connect(1);

        let committed = random_tx(16);
        let evicted = random_tx(16);
        let kept = random_tx(16);
        harness.deliver(1, &[committed.clone(), evicted.clone(), kept.clone()]);
        assert!(eventually(Duration::from_secs(1), || harness.reactor.sender_table().len() == 3).await);

        harness.mempool.update(1, &[committed.clone()]);
        assert!(harness.mempool.remove_tx(&evicted.key()));

        let table = harness.reactor.sender_table();
        assert!(!table.is_tracked(&committed.key()));
        assert!(!table.is_tracked(&evicted.key()));
        assert!(table.is_tracked(&kept.key()));

        harness.mempool.flush();
        assert!(table.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_commit_racing_admission_leaves_no_tracking() {
        let harness = Harness::fast();
        let _conn = harness.connect(1);

        // Commit each tx as soon as it lands, while the reactor may still be
        // about to record its sender.
        for height in 1..=200 {
            let tx = random_tx(16);
            harness.deliver(1, &[tx.clone()]);
            let landed = tokio::time::timeout(Duration::from_secs(1), async {
                while !harness.mempool.contains(&tx.key()) {
                    tokio::task::yield_now().await;
                }
            })
            .await;
            assert!(landed.is_ok(), "tx admitted");
            harness.mempool.update(height, &[tx]);
        }

        assert!(
            eventually(Duration::from_secs(1), || harness.reactor.sender_table().is_empty())
                .await
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(harness.reactor.sender_table().is_empty());
        assert_eq!(harness.mempool.size(), 0);
    }

    #[tokio::test]
    async fn test_commit_during_slow_validation_leaves_no_tracking() {
        let harness = Harness::with_slow_checks(8, Duration::from_millis(30));
        let _conn = harness.connect(1);

        let tx = random_tx(16);
        harness.deliver(1, &[tx.clone()]);
        assert!(eventually(Duration::from_secs(1), || harness.mempool.contains(&tx.key())).await);
        harness.mempool.update(1, &[tx.clone()]);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!harness.reactor.sender_table().is_tracked(&tx.key()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_block_commit_drains_network_tracking() {
        let network = LocalNetwork::start(&network_config(3));
        let txs: Vec<_> = (0..10).map(|_| random_tx(24)).collect();
        let keys: Vec<TxKey> = txs.iter().map(|t| t.key()).collect();
        for tx in txs {
            network.submit(0, tx).expect("admitted");
        }
        assert!(
            network
                .wait_for_convergence(&keys, Duration::from_secs(10))
                .await
        );

        // Receivers record their source once validation completes.
        for node in &network.nodes()[1..] {
            assert!(
                eventually(Duration::from_secs(5), || node.reactor.sender_table().len()
                    == keys.len())
                .await
            );
        }

        network.commit_block(1, keys.len());

        for node in network.nodes() {
            assert_eq!(node.mempool.size(), 0);
            assert!(node.reactor.sender_table().is_empty());
        }
        network.shutdown().await;
    }

    fn peer_node(i: u64) -> shared_types::NodeId {
        shared_types::NodeId::from_index(i)
    }
}
