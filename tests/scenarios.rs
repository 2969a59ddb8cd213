//! End-to-end network scenarios (§8). Each test wires up a small [`World`]
//! by hand — full mesh, generous link speeds unless the scenario is
//! specifically about bandwidth — and drives it with `run_while`/`step`
//! rather than going through `SimConfig`/CLI parsing.
//!
//! Success Criteria:
//! - S1: a lone fixed-interval miner with passive committers converges on
//!   one chain with no forks.
//! - S2: two equal-hash-rate miners on a fixed interval produce roughly
//!   equal block counts and leave at least one fork behind.
//! - S3: a client's transaction clears the endorse/order/validate pipeline
//!   with `meanEndorsementTime <= meanValidationTime <= meanLatency`.
//! - S4: an unresponsive peer's `INV` request times out and is retried
//!   against the next peer in line.
//! - S5: an out-of-order block is orphaned until its parent arrives, then
//!   lands.
//! - S6: a 1MB block crossing a 1MB/s-bottleneck link completes in 1.0s.

#[cfg(test)]
mod tests {
    use blocksim::blockchain::Block;
    use blocksim::network::peer_link::PeerLink;
    use blocksim::node::miner::MiningSchedule;
    use blocksim::node::{Node, NodeRole};
    use blocksim::protocol::NetworkMessage;
    use blocksim::sim::World;
    use std::collections::HashMap;

    const FAST_LINK_BYTES_PER_SEC: f64 = 10_000_000.0;

    /// A fully-connected mesh of `n` nodes, all with the same role and no
    /// mining schedule, wired with fast symmetric links. Callers override
    /// individual nodes' role/mining afterward.
    fn mesh(n: u64) -> World {
        let mut world = World::new();
        for addr in 0..n {
            let peers: Vec<u64> = (0..n).filter(|&p| p != addr).collect();
            let links = peers.iter().map(|&p| (p, PeerLink::new(p, FAST_LINK_BYTES_PER_SEC, FAST_LINK_BYTES_PER_SEC))).collect::<HashMap<_, _>>();
            let node = Node::new(addr, NodeRole::Committer, peers, links, None, Some(1000), 0.0, 20.0, 30.0, addr + 1);
            world.nodes.insert(addr, node);
        }
        world
    }

    #[test]
    fn s1_single_miner_converges_with_no_forks() {
        let mut world = mesh(3);
        world.nodes.get_mut(&0).unwrap().mining = Some(MiningSchedule::Fixed { interval_seconds: 2.0 });

        world.start_all();
        world.run_while(|w| w.clock.now() < 20.0);
        world.stop_all();

        assert!(world.nodes[&0].stats.miner_generated_blocks >= 9);

        let top_height = world.nodes[&0].state.blockchain.current_top().height;
        for addr in 0..3 {
            assert_eq!(world.nodes[&addr].state.blockchain.current_top().height, top_height);
            assert_eq!(world.nodes[&addr].state.blockchain.blocks_in_forks(), 0);
        }
    }

    #[test]
    fn s2_two_equal_miners_produce_comparable_counts_and_a_fork() {
        let mut world = mesh(3);
        for addr in [0, 1] {
            world.nodes.get_mut(&addr).unwrap().mining = Some(MiningSchedule::Fixed { interval_seconds: 2.0 });
        }

        world.start_all();
        world.run_while(|w| w.clock.now() < 40.0);
        world.stop_all();

        let a = world.nodes[&0].stats.miner_generated_blocks;
        let b = world.nodes[&1].stats.miner_generated_blocks;
        assert!(a > 0 && b > 0);
        assert!((a as i64 - b as i64).abs() <= 1, "expected near-equal block counts, got {a} vs {b}");

        let any_fork = (0..3).any(|addr| world.nodes[&addr].state.blockchain.blocks_in_forks() > 0);
        assert!(any_fork, "two miners racing on the same fixed interval should leave at least one fork");

        let h0 = world.nodes[&0].state.blockchain.current_top().height;
        let h1 = world.nodes[&1].state.blockchain.current_top().height;
        assert!((h0 as i64 - h1 as i64).abs() <= 1);
    }

    #[test]
    fn s3_endorsement_pipeline_orders_its_means() {
        let mut world = mesh(10);
        world.nodes.get_mut(&0).unwrap().mining = Some(MiningSchedule::Fixed { interval_seconds: 5.0 });
        for addr in 1..=6 {
            world.nodes.get_mut(&addr).unwrap().role = NodeRole::Endorser;
        }
        world.nodes.get_mut(&9).unwrap().role = NodeRole::Client;
        // Only 6 endorsers are present; cap the threshold to match, same as
        // `World::from_config` does for a real run.
        world.nodes.get_mut(&9).unwrap().endorser_reply_threshold = 6;

        world.start_all();
        world.run_while(|w| w.clock.now() < 20.0);
        world.stop_all();

        let endorsement = world.nodes[&1].stats.mean_endorsement_time;
        let validation = world.nodes[&7].stats.mean_validation_time;
        let latency = world.nodes[&9].stats.mean_latency;

        assert!(latency > 0.0, "client should have seen at least one round trip complete");
        assert!(endorsement <= validation + 1e-6);
        assert!(validation <= latency + 1e-6);
    }

    #[test]
    fn s4_unresponsive_peer_times_out_and_retries_the_next_one() {
        let mut world = mesh(3);
        // Node 2 advertises a block it will never actually hand over; node
        // 1 under test should retry against node 3, which has it for real.
        let block = Block { height: 1, miner_id: 3, parent_miner_id: 0, size_bytes: 1000, timestamp: 0.0, ..Block::genesis() };
        world.nodes.get_mut(&3).unwrap().state.blockchain.add(block.clone());
        world.nodes.get_mut(&1).unwrap().inv_timeout_seconds = 2.0;

        world.send_control(2, 1, NetworkMessage::inv(vec![block.hash_string()]));
        world.send_control(3, 1, NetworkMessage::inv(vec![block.hash_string()]));

        world.run_while(|w| w.clock.now() < 10.0);

        assert_eq!(world.nodes[&1].stats.block_timeouts, 1);
        assert!(world.nodes[&1].state.blockchain.has(block.id()));
    }

    #[test]
    fn s5_out_of_order_block_is_orphaned_then_reassembled() {
        let mut world = mesh(2);
        let parent = Block { height: 1, miner_id: 0, parent_miner_id: 0, size_bytes: 1000, timestamp: 0.0, ..Block::genesis() };
        let child = Block { height: 2, miner_id: 0, parent_miner_id: 0, size_bytes: 1000, timestamp: 0.0, ..Block::genesis() };

        // In the real INV -> HEADERS -> GET_DATA handshake the parent's
        // header would already be known (via GET_HEADERS) before its body
        // finishes arriving; mirror that here so the child's BLOCK clears
        // the §4.5 step-2 discard gate (an entirely unknown parent is
        // dropped, not orphaned) and actually reaches `validate()`.
        world.nodes.get_mut(&1).unwrap().state.only_headers_received.insert(parent.hash_string(), parent.header());

        // Child arrives first: it must be orphaned, not dropped.
        blocksim::node::block_arrival::on_arrived(&mut world, 1, 0, child.clone());
        assert!(world.nodes[&1].state.blockchain.is_orphan(child.id()));
        assert!(!world.nodes[&1].state.blockchain.has(child.id()));

        // The parent arrives next and should pull the child in behind it.
        blocksim::node::block_arrival::on_arrived(&mut world, 1, 0, parent.clone());
        world.run_while(|w| w.clock.pending_count() > 0);

        assert!(world.nodes[&1].state.blockchain.has(parent.id()));
        assert!(world.nodes[&1].state.blockchain.has(child.id()));
        assert!(!world.nodes[&1].state.blockchain.is_orphan(child.id()));
    }

    #[test]
    fn s6_block_transfer_time_matches_the_bottleneck_link_speed() {
        let mut world = World::new();
        let mut links_sender = HashMap::new();
        links_sender.insert(2, PeerLink::new(2, 1_000_000.0, 1_000_000.0)); // 1MB/s upload
        let mut links_receiver = HashMap::new();
        links_receiver.insert(1, PeerLink::new(1, 1_000_000.0, 10_000_000.0)); // 10MB/s download
        world.nodes.insert(1, Node::new(1, NodeRole::Committer, vec![2], links_sender, None, None, 0.0, 20.0, 30.0, 1));
        world.nodes.insert(2, Node::new(2, NodeRole::Committer, vec![1], links_receiver, None, None, 0.0, 20.0, 30.0, 2));

        let block = Block { height: 1, miner_id: 1, parent_miner_id: 0, size_bytes: 1_000_000, timestamp: 0.0, ..Block::genesis() };
        world.send_block(1, 2, block);
        assert!(world.step());

        assert!((world.clock.now() - 1.0).abs() < 0.001, "1MB over a 1MB/s bottleneck should take ~1.0s, took {}", world.clock.now());
    }

    /// Sanity check that `mesh` itself produces usable inventory plumbing,
    /// independent of the scenario tests above (guards against a future
    /// refactor of the helper silently breaking every test that uses it).
    #[test]
    fn mesh_helper_wires_symmetric_links() {
        let world = mesh(4);
        assert_eq!(world.nodes.len(), 4);
        for addr in 0..4 {
            assert_eq!(world.nodes[&addr].links.len(), 3);
        }
    }
}
