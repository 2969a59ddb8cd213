//! Per-node mutable state (§3).
//!
//! Owned exclusively by one [`crate::node::Node`] and mutated only from
//! that node's own event handlers — nothing here is ever shared or locked.

use crate::blockchain::{Block, BlockHeader, BlockchainStore, Transaction, TransactionId};
use crate::network::peer_link::BandwidthLedger;
use crate::network::PeerAddress;
use crate::sim::clock::EventId;
use std::collections::{HashMap, HashSet, VecDeque};

pub struct NodeState {
    pub address: PeerAddress,
    pub peers: Vec<PeerAddress>,

    pub blockchain: BlockchainStore,

    /// Every transaction this node has ever seen, keyed by its identity.
    pub transactions: HashMap<TransactionId, Transaction>,

    /// Queued for the next mined/ordered block. Miners and order nodes only.
    pub not_validated_transactions: VecDeque<Transaction>,

    /// Dedup set for forwarded `REPLY_TRANS`, keyed by `(node_id, trans_id,
    /// execution)` since several endorsers may reply to the same request.
    pub reply_transactions: HashSet<(u64, u64, u64)>,
    pub msg_transactions: HashSet<TransactionId>,
    pub result_transactions: HashSet<TransactionId>,

    /// Clients only: endorser ids that have replied, per transaction.
    pub waiting_endorsers: HashMap<TransactionId, HashSet<u64>>,

    pub received_not_validated: HashMap<String, Block>,
    pub only_headers_received: HashMap<String, BlockHeader>,

    pub queue_inv: HashMap<String, VecDeque<PeerAddress>>,
    pub inv_timeouts: HashMap<String, EventId>,

    pub send_block_times: BandwidthLedger,
    pub receive_block_times: BandwidthLedger,

    /// Per-sender unparsed byte buffer, for transports that hand this node
    /// raw framed bytes instead of pre-decoded [`crate::protocol::NetworkMessage`]s.
    /// The in-process event queue delivers typed messages directly and
    /// never touches this; it exists so [`crate::protocol::codec`] has a
    /// natural home to be wired into once a real byte-stream transport
    /// replaces the in-process one.
    pub buffered_data: HashMap<PeerAddress, String>,

    /// Clients only: monotonically increasing, starts at 1.
    pub next_trans_id: u64,
}

impl NodeState {
    pub fn new(address: PeerAddress, peers: Vec<PeerAddress>) -> Self {
        NodeState {
            address,
            peers,
            blockchain: BlockchainStore::new(),
            transactions: HashMap::new(),
            not_validated_transactions: VecDeque::new(),
            reply_transactions: HashSet::new(),
            msg_transactions: HashSet::new(),
            result_transactions: HashSet::new(),
            waiting_endorsers: HashMap::new(),
            received_not_validated: HashMap::new(),
            only_headers_received: HashMap::new(),
            queue_inv: HashMap::new(),
            inv_timeouts: HashMap::new(),
            send_block_times: BandwidthLedger::new(),
            receive_block_times: BandwidthLedger::new(),
            buffered_data: HashMap::new(),
            next_trans_id: 1,
        }
    }

    /// Whether a block hash is already known, in flight, or orphaned —
    /// the guard the `INV` handler uses to decide whether to request it
    /// (§4.4).
    pub fn block_known_or_pending(&self, hash: &str) -> bool {
        self.received_not_validated.contains_key(hash)
            || self.only_headers_received.contains_key(hash)
            || self.queue_inv.contains_key(hash)
    }
}
