//! Inventory coordinator (§4.8): tracks outstanding `INV` requests, their
//! timeouts, and the peers to retry against when a request stalls.

use crate::protocol::NetworkMessage;
use crate::sim::clock::EventKind;
use crate::sim::world::World;
use rand::Rng;

/// Send `GET_HEADERS`+`GET_DATA` for `hashes` to `peer` and arm a fresh
/// timeout for each hash (§4.4's `INV` row, and the retry leg of §4.8).
pub fn request_and_arm_timeout(world: &mut World, node_addr: u64, peer: u64, hashes: Vec<String>) {
    if hashes.is_empty() {
        return;
    }
    world.send_control(node_addr, peer, NetworkMessage::get_headers(hashes.clone()));
    world.send_control(node_addr, peer, NetworkMessage::get_data(hashes.clone()));
    for hash in hashes {
        arm_timeout(world, node_addr, hash);
    }
}

fn arm_timeout(world: &mut World, node_addr: u64, hash: String) {
    let timeout_seconds = world.nodes.get(&node_addr).expect("known node").inv_timeout_seconds;
    let at = world.clock.now() + timeout_seconds;
    let id = world.clock.schedule(at, EventKind::InvTimeout { node: node_addr, hash: hash.clone() });
    world
        .nodes
        .get_mut(&node_addr)
        .expect("known node")
        .state
        .inv_timeouts
        .insert(hash, id);
}

/// Delete a resolved (or abandoned) `queueInv`/`invTimeouts` entry,
/// cancelling its timeout. Safe to call on a hash with no entry (e.g. a
/// locally-mined block that was never requested).
pub fn clear(world: &mut World, node_addr: u64, hash: &str) {
    let timeout_id = {
        let node = world.nodes.get_mut(&node_addr).expect("known node");
        node.state.queue_inv.remove(hash);
        node.state.inv_timeouts.remove(hash)
    };
    if let Some(id) = timeout_id {
        world.clock.cancel(id);
    }
}

/// An outstanding `INV` request timed out without a `BLOCK` arriving
/// (§4.8): count it, drop the peer that just failed, and — if any
/// alternative peers remain and the block is still unknown — shuffle the
/// retry slot and try the new first peer with a fresh timeout.
pub fn handle_timeout(world: &mut World, node_addr: u64, hash: String) {
    let still_unknown = {
        let node = world.nodes.get(&node_addr).expect("known node");
        match crate::blockchain::parse_hash_string(&hash) {
            Some(id) => !node.state.blockchain.has(id),
            None => true,
        }
    };
    if !still_unknown {
        clear(world, node_addr, &hash);
        return;
    }

    world.nodes.get_mut(&node_addr).expect("known node").stats.block_timeouts += 1;

    let next_peer = {
        let node = world.nodes.get_mut(&node_addr).expect("known node");
        let Some(queue) = node.state.queue_inv.get_mut(&hash) else {
            return;
        };
        // The peer we just timed out on is always the current front.
        queue.pop_front();
        if queue.is_empty() {
            node.state.queue_inv.remove(&hash);
            node.state.inv_timeouts.remove(&hash);
            return;
        }
        let idx = node.rng.gen_range(0..queue.len());
        queue.swap(0, idx);
        queue.front().copied()
    };

    if let Some(peer) = next_peer {
        request_and_arm_timeout(world, node_addr, peer, vec![hash]);
    }
}
