//! Block values and the `"{height}/{minerId}"` hash-string identity scheme.
//!
//! The simulator models no real cryptography: a block's "hash" is simply
//! its `(height, minerId)` pair rendered as text, which is sufficient to
//! give every block a globally unique, human-readable key for the maps in
//! [`crate::blockchain::store`] and [`crate::node::inventory`].

use crate::blockchain::transaction::Transaction;
use crate::network::PeerAddress;
use serde::{Deserialize, Serialize};

/// `(height, minerId)` — a block's identity.
pub type BlockId = (u64, u64);

/// A block, as gossiped between nodes.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Block {
    pub height: u64,
    pub miner_id: u64,
    pub nonce: u64,
    pub parent_miner_id: u64,
    pub size_bytes: u32,
    pub timestamp: f64,
    /// Filled in by the receiver when the block body finishes arriving;
    /// `0.0` for locally-mined blocks.
    #[serde(default)]
    pub time_received: f64,
    /// The peer this block arrived from, so `AdvertiseNewBlock` (§4.5) can
    /// exclude it when re-gossiping. `None` for locally mined blocks.
    #[serde(default)]
    pub received_from: Option<PeerAddress>,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn genesis() -> Self {
        Block {
            height: 0,
            miner_id: 0,
            nonce: 0,
            parent_miner_id: 0,
            size_bytes: 0,
            timestamp: 0.0,
            time_received: 0.0,
            received_from: None,
            transactions: Vec::new(),
        }
    }

    /// `(height, miner_id)` identity.
    pub fn id(&self) -> BlockId {
        (self.height, self.miner_id)
    }

    /// Textual block-hash-string key, `"{height}/{minerId}"`.
    pub fn hash_string(&self) -> String {
        hash_string(self.height, self.miner_id)
    }

    /// `b` is the parent of `self` iff `b.height = self.height - 1 &&
    /// b.miner_id = self.parent_miner_id`.
    pub fn is_child_of(&self, parent: &Block) -> bool {
        self.height > 0
            && parent.height == self.height - 1
            && parent.miner_id == self.parent_miner_id
    }

    pub fn parent_id(&self) -> Option<BlockId> {
        if self.height == 0 {
            None
        } else {
            Some((self.height - 1, self.parent_miner_id))
        }
    }
}

/// Render a block-hash-string without needing a [`Block`] value in hand.
pub fn hash_string(height: u64, miner_id: u64) -> String {
    format!("{}/{}", height, miner_id)
}

/// Parse a `"{height}/{minerId}"` block-hash-string back into a [`BlockId`].
/// Malformed strings (the codec never produces them, but a peer could send
/// anything) return `None` rather than panicking.
pub fn parse_hash_string(s: &str) -> Option<BlockId> {
    let (height, miner_id) = s.split_once('/')?;
    Some((height.parse().ok()?, miner_id.parse().ok()?))
}

/// Everything needed to detect a block's position in the chain without its
/// (possibly large) transaction list — what `HEADERS` responses carry.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BlockHeader {
    pub height: u64,
    pub miner_id: u64,
    pub parent_miner_id: u64,
    pub timestamp: f64,
    pub size_bytes: u32,
}

impl Block {
    pub fn header(&self) -> BlockHeader {
        BlockHeader {
            height: self.height,
            miner_id: self.miner_id,
            parent_miner_id: self.parent_miner_id,
            timestamp: self.timestamp,
            size_bytes: self.size_bytes,
        }
    }
}

impl BlockHeader {
    pub fn id(&self) -> BlockId {
        (self.height, self.miner_id)
    }

    pub fn hash_string(&self) -> String {
        hash_string(self.height, self.miner_id)
    }

    pub fn parent_id(&self) -> Option<BlockId> {
        if self.height == 0 {
            None
        } else {
            Some((self.height - 1, self.parent_miner_id))
        }
    }
}
