//! Per-message handlers (§4.4's table), dispatched once a
//! [`NetworkMessage`] is delivered to a node.

use super::{block_arrival, inventory};
use crate::blockchain::{hash_string, parse_hash_string, Transaction};
use crate::node::role::NodeRole;
use crate::protocol::NetworkMessage;
use crate::sim::world::World;

pub fn handle(world: &mut World, to: u64, from: u64, message: NetworkMessage) {
    match message {
        NetworkMessage::Inv { hashes, .. } => handle_inv(world, to, from, hashes),
        NetworkMessage::GetHeaders { hashes, .. } => handle_get_headers(world, to, from, hashes),
        NetworkMessage::Headers { headers, .. } => handle_headers(world, to, from, headers),
        NetworkMessage::GetData { hashes, .. } => handle_get_data(world, to, from, hashes),
        NetworkMessage::Block { block, .. } => handle_block(world, to, from, block),
        NetworkMessage::NoMessage { .. } => {}
        NetworkMessage::RequestTrans { transaction, .. } => handle_request_trans(world, to, from, transaction),
        NetworkMessage::ReplyTrans { node_id, trans_id, execution, .. } => {
            handle_reply_trans(world, to, from, node_id, trans_id, execution)
        }
        NetworkMessage::MsgTrans { transaction, .. } => handle_msg_trans(world, to, from, transaction),
        NetworkMessage::ResultTrans { node_id, trans_id, .. } => handle_result_trans(world, to, from, node_id, trans_id),
    }
}

fn is_client(world: &World, addr: u64) -> bool {
    world.nodes[&addr].role.is_client()
}

fn peers_except(world: &World, addr: u64, exclude: u64) -> Vec<u64> {
    world.nodes[&addr].state.peers.iter().copied().filter(|p| *p != exclude).collect()
}

fn handle_inv(world: &mut World, to: u64, from: u64, hashes: Vec<String>) {
    if is_client(world, to) {
        return;
    }
    let mut first_time = Vec::new();
    {
        let node = world.nodes.get_mut(&to).expect("known node");
        for hash in hashes {
            let already_resolved = match parse_hash_string(&hash) {
                Some(id) => node.state.blockchain.has(id) || node.state.blockchain.is_orphan(id),
                None => false,
            } || node.state.received_not_validated.contains_key(&hash)
                || node.state.only_headers_received.contains_key(&hash);

            if already_resolved {
                continue;
            }

            match node.state.queue_inv.get_mut(&hash) {
                Some(queue) => {
                    if !queue.contains(&from) {
                        queue.push_back(from);
                    }
                }
                None => {
                    node.state.queue_inv.entry(hash.clone()).or_default().push_back(from);
                    first_time.push(hash);
                }
            }
        }
    }
    inventory::request_and_arm_timeout(world, to, from, first_time);
}

fn handle_get_headers(world: &mut World, to: u64, from: u64, hashes: Vec<String>) {
    if is_client(world, to) {
        return;
    }
    let headers = {
        let node = &world.nodes[&to];
        hashes
            .iter()
            .filter_map(|hash| {
                if let Some(id) = parse_hash_string(hash) {
                    if let Some(block) = node.state.blockchain.return_block(id.0, id.1) {
                        return Some(block.header());
                    }
                }
                node.state.received_not_validated.get(hash).map(|b| b.header())
            })
            .collect::<Vec<_>>()
    };
    if !headers.is_empty() {
        world.send_control(to, from, NetworkMessage::headers(headers));
    }
}

fn handle_headers(world: &mut World, to: u64, from: u64, headers: Vec<crate::blockchain::BlockHeader>) {
    if is_client(world, to) {
        return;
    }
    let mut need_parent = Vec::new();
    {
        let node = world.nodes.get_mut(&to).expect("known node");
        for header in headers {
            let hash = header.hash_string();
            node.state.only_headers_received.insert(hash, header.clone());

            if let Some(parent_id) = header.parent_id() {
                let parent_hash = hash_string(parent_id.0, parent_id.1);
                let parent_known = node.state.blockchain.has(parent_id)
                    || node.state.blockchain.is_orphan(parent_id)
                    || node.state.only_headers_received.contains_key(&parent_hash)
                    || node.state.received_not_validated.contains_key(&parent_hash);
                if !parent_known {
                    need_parent.push(parent_hash);
                }
            }
        }
    }
    inventory::request_and_arm_timeout(world, to, from, need_parent);
}

fn handle_get_data(world: &mut World, to: u64, from: u64, hashes: Vec<String>) {
    if is_client(world, to) {
        return;
    }
    let blocks = {
        let node = &world.nodes[&to];
        hashes
            .iter()
            .filter_map(|h| parse_hash_string(h))
            .filter_map(|id| node.state.blockchain.return_block(id.0, id.1))
            .collect::<Vec<_>>()
    };
    for block in blocks {
        world.send_block(to, from, block);
    }
}

fn handle_block(world: &mut World, to: u64, from: u64, block: crate::blockchain::Block) {
    if is_client(world, to) {
        return;
    }
    block_arrival::on_arrived(world, to, from, block);
}

fn handle_request_trans(world: &mut World, to: u64, from: u64, transaction: Transaction) {
    if is_client(world, to) {
        return;
    }
    if world.nodes[&to].state.transactions.contains_key(&transaction.id()) {
        return;
    }

    let is_endorser = world.nodes[&to].role == NodeRole::Endorser;
    {
        let node = world.nodes.get_mut(&to).expect("known node");
        let mut stored = transaction.clone();
        if is_endorser {
            stored.execution = to;
        }
        node.state.transactions.insert(stored.id(), stored);
    }

    if is_endorser {
        let now = world.clock.now();
        world.nodes.get_mut(&to).expect("known node").stats.record_endorsement_time(now - transaction.timestamp);
        world.send_control(to, from, NetworkMessage::reply_trans(transaction.node_id, transaction.trans_id, to));
    } else {
        let peers = peers_except(world, to, from);
        world.broadcast_control(to, &peers, NetworkMessage::request_trans(transaction));
    }
}

fn handle_reply_trans(world: &mut World, to: u64, from: u64, node_id: u64, trans_id: u64, execution: u64) {
    if is_client(world, to) {
        if node_id != to {
            return;
        }
        let reached_threshold = {
            let node = world.nodes.get_mut(&to).expect("known node");
            let set = node.state.waiting_endorsers.entry((node_id, trans_id)).or_default();
            set.insert(execution);
            set.len() >= node.endorser_reply_threshold
        };
        if !reached_threshold {
            return;
        }
        let (transaction, peers) = {
            let node = world.nodes.get_mut(&to).expect("known node");
            node.state.waiting_endorsers.remove(&(node_id, trans_id));
            (node.state.transactions.get(&(node_id, trans_id)).cloned(), node.state.peers.clone())
        };
        if let Some(transaction) = transaction {
            world.broadcast_control(to, &peers, NetworkMessage::msg_trans(transaction));
        }
    } else {
        let key = (node_id, trans_id, execution);
        if world.nodes[&to].state.reply_transactions.contains(&key) {
            return;
        }
        world.nodes.get_mut(&to).expect("known node").state.reply_transactions.insert(key);
        let peers = peers_except(world, to, from);
        world.broadcast_control(to, &peers, NetworkMessage::reply_trans(node_id, trans_id, execution));
    }
}

fn handle_msg_trans(world: &mut World, to: u64, from: u64, transaction: Transaction) {
    if is_client(world, to) {
        return;
    }
    if world.nodes[&to].state.msg_transactions.contains(&transaction.id()) {
        return;
    }
    world.nodes.get_mut(&to).expect("known node").state.msg_transactions.insert(transaction.id());
    world
        .nodes
        .get_mut(&to)
        .expect("known node")
        .state
        .transactions
        .entry(transaction.id())
        .or_insert_with(|| transaction.clone());

    if world.nodes[&to].produces_blocks() {
        world.nodes.get_mut(&to).expect("known node").state.not_validated_transactions.push_back(transaction);
    } else {
        let peers = peers_except(world, to, from);
        world.broadcast_control(to, &peers, NetworkMessage::msg_trans(transaction));
    }
}

fn handle_result_trans(world: &mut World, to: u64, from: u64, node_id: u64, trans_id: u64) {
    let key = (node_id, trans_id);
    if world.nodes[&to].state.result_transactions.contains(&key) {
        return;
    }
    world.nodes.get_mut(&to).expect("known node").state.result_transactions.insert(key);

    if to == node_id {
        let timestamp = world.nodes[&to].state.transactions.get(&key).map(|t| t.timestamp);
        if let Some(timestamp) = timestamp {
            let now = world.clock.now();
            world.nodes.get_mut(&to).expect("known node").stats.record_latency(now - timestamp);
        }
    } else {
        let peers = peers_except(world, to, from);
        world.broadcast_control(to, &peers, NetworkMessage::result_trans(node_id, trans_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::peer_link::PeerLink;
    use crate::node::Node;
    use std::collections::HashMap;

    fn pair(role_a: NodeRole, role_b: NodeRole) -> World {
        let mut world = World::new();
        let mut links_a = HashMap::new();
        links_a.insert(2, PeerLink::new(2, 1_000_000.0, 1_000_000.0));
        let mut links_b = HashMap::new();
        links_b.insert(1, PeerLink::new(1, 1_000_000.0, 1_000_000.0));
        world.nodes.insert(1, Node::new(1, role_a, vec![2], links_a, None, None, 0.0, 20.0, 30.0, 1));
        world.nodes.insert(2, Node::new(2, role_b, vec![1], links_b, None, None, 0.0, 20.0, 30.0, 2));
        world
    }

    #[test]
    fn endorser_replies_and_stamps_execution() {
        let mut world = pair(NodeRole::Client, NodeRole::Endorser);
        let tx = Transaction::new(1, 1, 0.0);
        handle_request_trans(&mut world, 2, 1, tx.clone());
        assert_eq!(world.nodes[&2].state.transactions[&tx.id()].execution, 2);
        assert!(world.clock.pending_count() >= 1); // the REPLY_TRANS send
    }

    #[test]
    fn committer_forwards_request_trans_excluding_the_sender() {
        let mut world = pair(NodeRole::Committer, NodeRole::Committer);
        world.nodes.get_mut(&1).unwrap().state.peers = vec![2, 3];
        world.nodes.insert(3, Node::new(3, NodeRole::Committer, vec![1], HashMap::new(), None, None, 0.0, 20.0, 30.0, 3));
        let tx = Transaction::new(9, 1, 0.0);
        handle_request_trans(&mut world, 1, 2, tx.clone());
        // forwarded only to peer 3, not back to sender 2 -- check by draining events
        let mut targets = Vec::new();
        while let Some((_, kind)) = world.clock.pop_next() {
            if let crate::sim::clock::EventKind::PacketArrival { to, .. } = kind {
                targets.push(to);
            }
        }
        assert_eq!(targets, vec![3]);
    }

    #[test]
    fn duplicate_result_trans_is_not_forwarded_twice() {
        let mut world = pair(NodeRole::Committer, NodeRole::Committer);
        handle_result_trans(&mut world, 1, 2, 9, 1);
        let first_count = world.clock.pending_count();
        handle_result_trans(&mut world, 1, 2, 9, 1);
        assert_eq!(world.clock.pending_count(), first_count);
    }
}
