//! The per-node protocol state machine (§4.4-§4.9) — the central
//! component of the simulator.
//!
//! [`Node`] bundles everything one simulated participant owns: its role,
//! its mutable [`state::NodeState`], its running [`crate::stats::NodeStatistics`],
//! its per-peer links, and (orthogonally to role, per §2) an optional
//! [`miner::MiningSchedule`] that makes it produce blocks. Handlers live in
//! sibling modules (`messages`, `block_arrival`, `miner`, `inventory`,
//! `client`) as free functions over `&mut sim::World` rather than methods on
//! `Node`, because most of them need to reach into *other* nodes and the
//! shared clock — see `sim::world` for why that shape avoids fighting the
//! borrow checker.

pub mod block_arrival;
pub mod client;
pub mod inventory;
pub mod messages;
pub mod miner;
pub mod order;
pub mod role;
pub mod state;

pub use role::NodeRole;
pub use state::NodeState;

use crate::network::peer_link::PeerLink;
use crate::network::PeerAddress;
use crate::sim::clock::EventId;
use crate::stats::NodeStatistics;
use miner::MiningSchedule;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;

/// Default endorser-reply threshold a client waits for before broadcasting
/// `MSG_TRANS` (§4.4's `REPLY_TRANS` row).
pub const DEFAULT_ENDORSER_REPLY_THRESHOLD: usize = 10;

pub struct Node {
    pub address: PeerAddress,
    pub role: NodeRole,
    pub state: NodeState,
    pub stats: NodeStatistics,
    pub links: HashMap<PeerAddress, PeerLink>,

    /// Present iff this node produces blocks — a PoW-style committer with
    /// `--miners` assigned to it, or a Hyperledger-style `order` node
    /// (§4.9). Orthogonal to `role`, per §2.
    pub mining: Option<MiningSchedule>,
    pub fixed_block_size: Option<u32>,
    pub mining_event_id: Option<EventId>,
    pub last_mine_time: f64,

    /// Clients only: the `[1, creating_transaction_time]` interval of §4.6.
    pub creating_transaction_time: f64,
    /// Clients only: how many `REPLY_TRANS` replies to collect per
    /// transaction before broadcasting `MSG_TRANS` (§4.4).
    pub endorser_reply_threshold: usize,

    pub inv_timeout_seconds: f64,

    pub rng: StdRng,
}

impl Node {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        address: PeerAddress,
        role: NodeRole,
        peers: Vec<PeerAddress>,
        links: HashMap<PeerAddress, PeerLink>,
        mining: Option<MiningSchedule>,
        fixed_block_size: Option<u32>,
        hash_rate: f64,
        creating_transaction_time: f64,
        inv_timeout_seconds: f64,
        rng_seed: u64,
    ) -> Self {
        let is_pow_miner = matches!(role, NodeRole::Committer) && mining.is_some();
        Node {
            address,
            role,
            state: NodeState::new(address, peers),
            stats: NodeStatistics::new(address, role.wire_code(), is_pow_miner, hash_rate),
            links,
            mining,
            fixed_block_size,
            mining_event_id: None,
            last_mine_time: 0.0,
            creating_transaction_time,
            endorser_reply_threshold: DEFAULT_ENDORSER_REPLY_THRESHOLD,
            inv_timeout_seconds,
            rng: StdRng::seed_from_u64(rng_seed),
        }
    }

    /// Whether this node's mining/ordering cadence counts toward the
    /// PoW-miner statistics fields (`miner`, `minerGeneratedBlocks`, ...)
    /// rather than just cutting blocks on a fixed schedule (§4.9: `order`
    /// nodes cut blocks too, but are not "miners" for stats purposes).
    pub fn is_pow_miner(&self) -> bool {
        self.stats.miner
    }

    pub fn produces_blocks(&self) -> bool {
        self.mining.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_miner_committer_has_no_mining_schedule() {
        let node = Node::new(1, NodeRole::Committer, vec![2], HashMap::new(), None, None, 0.0, 20.0, 30.0, 1);
        assert!(!node.produces_blocks());
        assert!(!node.is_pow_miner());
    }

    #[test]
    fn miner_committer_reports_stats_miner_flag() {
        let schedule = MiningSchedule::Fixed { interval_seconds: 2.0 };
        let node = Node::new(1, NodeRole::Committer, vec![2], HashMap::new(), Some(schedule), None, 1.0, 20.0, 30.0, 1);
        assert!(node.produces_blocks());
        assert!(node.is_pow_miner());
    }

    #[test]
    fn order_node_produces_blocks_but_is_not_counted_as_miner() {
        let schedule = MiningSchedule::Fixed { interval_seconds: 5.0 };
        let node = Node::new(1, NodeRole::Order, vec![2], HashMap::new(), Some(schedule), None, 0.0, 20.0, 30.0, 1);
        assert!(node.produces_blocks());
        assert!(!node.is_pow_miner());
    }
}
