//! # Inbound Protocol Flows
//!
//! Batches are processed transaction by transaction; a message that is not a
//! transaction batch costs the sender its connection.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mempool_reactor::{
        Envelope, Mempool, MempoolMessage, Peer, Reactor, ReactorConfig, ReactorError, Tx, Txs,
        MEMPOOL_CHANNEL, UNKNOWN_PEER_ID,
    };
    use node_runtime::{LocalNetwork, NodeConfig};
    use shared_types::NodeId;

    use crate::integration::fixtures::{eventually, random_tx, Harness};

    // =========================================================================
    // BATCH ISOLATION
    // =========================================================================

    #[tokio::test]
    async fn test_bad_tx_does_not_abort_batch() {
        let harness = Harness::new(ReactorConfig {
            max_tx_bytes: 64,
            ..ReactorConfig::default()
        });
        let _conn = harness.connect(1);

        let already_known = random_tx(16);
        harness.submit(already_known.clone()).await;

        let first = random_tx(16);
        let oversized = random_tx(65);
        let last = random_tx(16);
        harness.deliver(
            1,
            &[first.clone(), oversized.clone(), already_known.clone(), last.clone()],
        );

        assert!(
            eventually(Duration::from_secs(1), || harness.mempool.size() == 3).await,
            "both valid txs admitted next to the known one"
        );
        assert!(harness.mempool.contains(&first.key()));
        assert!(harness.mempool.contains(&last.key()));
        assert!(!harness.mempool.contains(&oversized.key()));

        assert!(
            eventually(Duration::from_secs(1), || harness.reactor.sender_table().len() == 2)
                .await
        );
        // Cached duplicates never record their sender.
        assert!(!harness
            .reactor
            .sender_table()
            .is_tracked(&already_known.key()));
        assert!(harness.switch.stopped_peers().is_empty());
    }

    #[tokio::test]
    async fn test_empty_batch_is_logged_not_punished() {
        let harness = Harness::fast();
        let (peer, _rx) = harness.connect(1);

        harness.reactor.receive(Envelope::new(
            NodeId::from_index(1),
            MempoolMessage::Txs(Txs { txs: Vec::new() }),
        ));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(harness.mempool.size(), 0);
        assert!(harness.reactor.sender_table().is_empty());
        assert!(harness.switch.stopped_peers().is_empty());
        assert!(peer.is_running());
    }

    // =========================================================================
    // PROTOCOL VIOLATIONS
    // =========================================================================

    #[tokio::test]
    async fn test_unknown_message_stops_peer_without_admission() {
        let harness = Harness::fast();
        let (peer, _rx) = harness.connect(1);

        harness.reactor.receive(Envelope::new(
            NodeId::from_index(1),
            MempoolMessage::Unknown {
                kind: "BlockPart".into(),
            },
        ));

        assert!(!peer.is_running());
        assert_eq!(harness.mempool.size(), 0);
        assert_eq!(
            harness.switch.stopped_peers(),
            vec![(
                NodeId::from_index(1),
                ReactorError::UnknownMessage {
                    kind: "BlockPart".into()
                }
            )]
        );
    }

    #[tokio::test]
    async fn test_undecodable_bytes_stop_peer() {
        let harness = Harness::fast();
        let (peer, _rx) = harness.connect(1);

        harness
            .reactor
            .receive_bytes(NodeId::from_index(1), MEMPOOL_CHANNEL, b"\xff\xff\xff\xff garbage");

        assert!(!peer.is_running());
        let stopped = harness.switch.stopped_peers();
        assert_eq!(stopped.len(), 1);
        assert!(matches!(stopped[0].1, ReactorError::Decode(_)));
    }

    #[tokio::test]
    async fn test_wire_roundtrip_admits_tx() {
        let harness = Harness::fast();
        let _conn = harness.connect(1);
        let tx = Tx::new(b"over the wire".to_vec());

        let wire = MempoolMessage::single(&tx).encode().expect("encodes");
        harness
            .reactor
            .receive_bytes(NodeId::from_index(1), MEMPOOL_CHANNEL, &wire);

        assert!(eventually(Duration::from_secs(1), || harness.mempool.contains(&tx.key())).await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_violation_disconnects_and_reclaims_on_network() {
        let mut config = NodeConfig::default();
        config.simulation.nodes = 2;
        let network = LocalNetwork::start(&config);
        let offender = network.node(0).id;
        let victim = network.node(1);

        victim.reactor.receive(Envelope::new(
            offender,
            MempoolMessage::Unknown {
                kind: "Vote".into(),
            },
        ));

        // The victim's forwarder notices the stop and detaches the peer.
        assert!(
            eventually(Duration::from_secs(2), || victim
                .reactor
                .peer_ids()
                .get_for_peer(&offender)
                == UNKNOWN_PEER_ID)
            .await
        );
        assert!(!network.peer(1, 0).map(|p| p.is_running()).unwrap_or(true));

        network.shutdown().await;
    }
}
