//! # Lifecycle Flows
//!
//! Peer ids across connect/disconnect churn, reactor start/stop, and the
//! broadcast switch.

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    use mempool_reactor::adapters::ChannelPeer;
    use mempool_reactor::{
        Mempool, Peer, PeerIdRegistry, Reactor, ReactorConfig, ReactorError, UNKNOWN_PEER_ID,
    };
    use shared_types::NodeId;

    use crate::integration::fixtures::{drain_txs, eventually, random_tx, Harness};

    // =========================================================================
    // PEER IDS
    // =========================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reservations_are_unique() {
        let registry = Arc::new(PeerIdRegistry::new());

        let handles: Vec<_> = (1..=200u64)
            .map(|i| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move {
                    let node = NodeId::from_index(i);
                    registry.reserve_for_peer(&node).expect("free id");
                    registry.get_for_peer(&node)
                })
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            let id = handle.await.unwrap();
            assert_ne!(id, UNKNOWN_PEER_ID);
            assert!(ids.insert(id), "duplicate id {id}");
        }
        assert_eq!(registry.active_count(), 200);
    }

    #[tokio::test]
    async fn test_reclaimed_ids_are_reassignable() {
        let harness = Harness::with_max_peers(2);

        let (a, _rx_a) = harness.connect(1);
        let (b, _rx_b) = harness.connect(2);
        let (c, _rx_c) = ChannelPeer::new(harness.id, NodeId::from_index(3), 4);
        assert_eq!(
            harness.reactor.init_peer(&*c),
            Err(ReactorError::NoFreePeerIds { max: 2 })
        );

        harness.reactor.remove_peer(&*a);
        harness.reactor.init_peer(&*c).expect("id freed by disconnect");

        let ids: HashSet<_> = [&b, &c]
            .iter()
            .map(|p| harness.reactor.peer_ids().get_for_peer(&p.id()))
            .collect();
        assert_eq!(ids.len(), 2);
        assert!(!ids.contains(&UNKNOWN_PEER_ID));
    }

    #[tokio::test]
    async fn test_reclaim_is_idempotent() {
        let harness = Harness::fast();
        let (a, _rx) = harness.connect(1);
        let (b, _rx_b) = harness.connect(2);
        let b_id = harness.reactor.peer_ids().get_for_peer(&b.id());

        harness.reactor.remove_peer(&*a);
        harness.reactor.remove_peer(&*a);
        // Never-reserved peer.
        harness.reactor.peer_ids().reclaim(&NodeId::from_index(99));

        assert_eq!(harness.reactor.peer_ids().active_count(), 1);
        assert_eq!(harness.reactor.peer_ids().get_for_peer(&b.id()), b_id);
    }

    #[tokio::test]
    async fn test_peer_without_id_is_admitted_but_not_gossiped_to() {
        let harness = Harness::with_max_peers(1);
        let _first = harness.connect(1);

        let (late, _rx) = ChannelPeer::new(harness.id, NodeId::from_index(2), 4);
        assert!(harness.reactor.init_peer(&*late).is_err());
        assert!(harness.reactor.add_peer(late).is_none());

        let tx = random_tx(16);
        harness.deliver(2, &[tx.clone()]);
        assert!(eventually(Duration::from_secs(1), || harness.mempool.contains(&tx.key())).await);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(harness.reactor.sender_table().is_empty());
    }

    #[tokio::test]
    async fn test_recycled_id_still_receives_tx_from_departed_peer() {
        let harness = Harness::with_slow_checks(1, Duration::from_millis(50));
        let (departed, _rx_departed) = harness.connect(1);
        let departed_id = harness.reactor.peer_ids().get_for_peer(&departed.id());

        let tx = random_tx(16);
        harness.deliver(1, &[tx.clone()]);

        // Leaves while its tx is still validating; its id goes to the newcomer.
        departed.stop();
        harness.reactor.remove_peer(&*departed);
        let (newcomer, mut rx) = harness.connect(2);
        assert_eq!(
            harness.reactor.peer_ids().get_for_peer(&newcomer.id()),
            departed_id
        );
        harness.reactor.add_peer(newcomer).expect("broadcast task");

        assert_eq!(drain_txs(&mut rx, Duration::from_millis(300)).await, vec![tx.clone()]);
        assert!(!harness
            .reactor
            .sender_table()
            .is_sender(&tx.key(), departed_id));
    }

    // =========================================================================
    // START / STOP
    // =========================================================================

    #[tokio::test]
    async fn test_stop_ends_all_routines() {
        let harness = Harness::fast();
        let handles: Vec<_> = (1..=3)
            .map(|i| {
                let (peer, _rx) = harness.connect(i);
                harness.reactor.add_peer(peer).expect("broadcast task")
            })
            .collect();

        harness.reactor.on_stop();
        assert!(!harness.reactor.is_running());

        for handle in handles {
            tokio::time::timeout(Duration::from_secs(1), handle)
                .await
                .expect("routine ends on stop")
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_peer_quit_ends_its_routine_only() {
        let harness = Harness::fast();
        let (leaving, _rx_leaving) = harness.connect(1);
        let (staying, mut rx_staying) = harness.connect(2);

        let leaving_task = harness.reactor.add_peer(leaving.clone()).expect("task");
        let _staying_task = harness.reactor.add_peer(staying).expect("task");

        leaving.stop();
        harness.reactor.remove_peer(&*leaving);
        tokio::time::timeout(Duration::from_secs(1), leaving_task)
            .await
            .expect("routine ends on quit")
            .unwrap();

        let tx = random_tx(16);
        harness.submit(tx.clone()).await;
        assert_eq!(
            drain_txs(&mut rx_staying, Duration::from_millis(150)).await,
            vec![tx]
        );
    }

    #[tokio::test]
    async fn test_broadcast_disabled_still_admits() {
        let harness = Harness::new(ReactorConfig {
            broadcast: false,
            ..ReactorConfig::default()
        });
        let (peer, mut rx) = harness.connect(1);
        assert!(harness.reactor.add_peer(peer).is_none());

        let tx = random_tx(16);
        harness.deliver(1, &[tx.clone()]);
        assert!(eventually(Duration::from_secs(1), || harness.mempool.contains(&tx.key())).await);
        assert!(drain_txs(&mut rx, Duration::from_millis(50)).await.is_empty());
    }
}
