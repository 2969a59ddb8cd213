//! The three wire-visible node roles, plus the `order` role borrowed from
//! Hyperledger-style fabrics (§4.9).

use serde::{Deserialize, Serialize};

/// Mining is an orthogonal capability (`Node::miner`), not a role: a
/// committer or an order node may additionally mine/order blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeRole {
    Committer,
    Endorser,
    Client,
    Order,
}

impl NodeRole {
    /// The `nodeType` wire code from §6: committer=0, endorser=1, client=2,
    /// order=3.
    pub fn wire_code(self) -> u8 {
        match self {
            NodeRole::Committer => 0,
            NodeRole::Endorser => 1,
            NodeRole::Client => 2,
            NodeRole::Order => 3,
        }
    }

    pub fn is_client(self) -> bool {
        matches!(self, NodeRole::Client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes_match_the_external_interface_table() {
        assert_eq!(NodeRole::Committer.wire_code(), 0);
        assert_eq!(NodeRole::Endorser.wire_code(), 1);
        assert_eq!(NodeRole::Client.wire_code(), 2);
        assert_eq!(NodeRole::Order.wire_code(), 3);
    }
}
