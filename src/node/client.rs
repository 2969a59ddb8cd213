//! Client transaction creation (§4.6).

use crate::blockchain::Transaction;
use crate::protocol::NetworkMessage;
use crate::sim::clock::EventKind;
use crate::sim::world::World;
use rand::Rng;

/// Schedule the first `create_transaction` timer for a client node, to be
/// called once at `Node::start` (§4.4).
pub fn schedule_first(world: &mut World, node_addr: u64) {
    world.clock.schedule(world.clock.now(), EventKind::ClientTransactionTimer { node: node_addr });
}

/// A client's transaction-creation timer fired (§4.6): mint a fresh
/// transaction, broadcast `REQUEST_TRANS`, and reschedule at a uniformly
/// random interval in `[1, creating_transaction_time]`.
pub fn on_timer(world: &mut World, node_addr: u64) {
    let now = world.clock.now();

    let (transaction, peers, next_interval) = {
        let node = world.nodes.get_mut(&node_addr).expect("known node");
        let trans_id = node.state.next_trans_id;
        node.state.next_trans_id += 1;

        let transaction = Transaction::new(node_addr, trans_id, now);
        node.state.transactions.insert(transaction.id(), transaction.clone());
        node.stats.node_generated_transaction += 1;

        let next_interval = node.rng.gen_range(1.0..=node.creating_transaction_time.max(1.0));
        (transaction, node.state.peers.clone(), next_interval)
    };

    world.broadcast_control(node_addr, &peers, NetworkMessage::request_trans(transaction));

    let at = now + next_interval;
    world.clock.schedule(at, EventKind::ClientTransactionTimer { node: node_addr });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::peer_link::PeerLink;
    use crate::node::role::NodeRole;
    use crate::node::Node;
    use std::collections::HashMap;

    #[test]
    fn timer_fire_mints_a_transaction_and_reschedules() {
        let mut world = World::new();
        let mut links = HashMap::new();
        links.insert(2, PeerLink::new(2, 1_000_000.0, 1_000_000.0));
        world
            .nodes
            .insert(1, Node::new(1, NodeRole::Client, vec![2], links.clone(), None, None, 0.0, 5.0, 30.0, 1));
        world.nodes.insert(2, Node::new(2, NodeRole::Committer, vec![1], HashMap::new(), None, None, 0.0, 5.0, 30.0, 2));

        on_timer(&mut world, 1);

        assert_eq!(world.nodes[&1].stats.node_generated_transaction, 1);
        assert_eq!(world.nodes[&1].state.next_trans_id, 2);
        assert!(world.clock.pending_count() >= 1); // reschedule + delivery of REQUEST_TRANS
    }
}
