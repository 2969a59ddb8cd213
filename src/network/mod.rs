//! Peer addressing and the per-peer bandwidth model (§4.3).

pub mod peer_link;

/// A node's address is just its node id: the simulator has no real sockets,
/// so there is nothing else to address by. Kept as a distinct alias (rather
/// than bare `u64`) so call sites read as "peer", not "count".
pub type PeerAddress = u64;
