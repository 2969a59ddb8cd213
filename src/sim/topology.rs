//! Assigning peers, link speeds and region tags to node ids.
//!
//! The fleet-scale topology generator that chooses who peers with whom
//! across a large experiment is out of scope here; [`TopologyGenerator`] is
//! the seam such a generator would plug into, and [`RandomTopology`] is a
//! uniform-random reference implementation sufficient to drive the node
//! state machines in tests and small runs.

use crate::network::PeerAddress;
use rand::Rng;

/// Coarse region tag used to pick realistic-looking per-node link speeds.
/// No numeric table for this exists in the ns-3 source this crate's
/// protocol behavior is modeled on (only the region enum itself does); the
/// Mbps figures in [`regional_speed_mbps`] are reasonable placeholders, not
/// measured data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Region {
    NorthAmerica,
    Europe,
    AsiaPacific,
    SouthAmerica,
    Other,
}

impl Region {
    pub const ALL: [Region; 5] = [
        Region::NorthAmerica,
        Region::Europe,
        Region::AsiaPacific,
        Region::SouthAmerica,
        Region::Other,
    ];
}

/// `(download_mbps, upload_mbps)` for a region. Asymmetric, reflecting
/// typical residential/datacenter broadband skew rather than any specific
/// measurement.
pub fn regional_speed_mbps(region: Region) -> (f64, f64) {
    match region {
        Region::NorthAmerica => (100.0, 20.0),
        Region::Europe => (80.0, 20.0),
        Region::AsiaPacific => (60.0, 15.0),
        Region::SouthAmerica => (40.0, 10.0),
        Region::Other => (30.0, 8.0),
    }
}

fn mbps_to_bytes_per_sec(mbps: f64) -> f64 {
    mbps * 1_000_000.0 / 8.0
}

/// One node's position in the generated topology: who it talks to, and at
/// what speed, in each direction.
#[derive(Clone, Debug)]
pub struct NodeTopology {
    pub address: PeerAddress,
    pub region: Region,
    pub peers: Vec<PeerAddress>,
    pub download_speed: f64,
    pub upload_speed: f64,
}

/// Assigns every node in `0..node_count` a region, a link speed pair, and a
/// peer list. Implementations decide connectivity shape (ring, random
/// graph, scale-free, ...); this crate only needs *a* satisfiable one.
pub trait TopologyGenerator {
    fn generate(&mut self, node_count: u64) -> Vec<NodeTopology>;
}

/// Connects each node to `min_connections..=max_connections` distinct
/// uniformly-random peers (excluding itself), and assigns a uniformly
/// random region. Peer lists are not guaranteed symmetric: `a` listing `b`
/// does not imply `b` lists `a` (mirrors the same asymmetry the `timed`
/// peer tables model between inbound/outbound connections).
pub struct RandomTopology<R: Rng> {
    rng: R,
    min_connections: usize,
    max_connections: usize,
}

impl<R: Rng> RandomTopology<R> {
    pub fn new(rng: R, min_connections: usize, max_connections: usize) -> Self {
        RandomTopology {
            rng,
            min_connections: min_connections.max(1),
            max_connections: max_connections.max(min_connections.max(1)),
        }
    }
}

impl<R: Rng> TopologyGenerator for RandomTopology<R> {
    fn generate(&mut self, node_count: u64) -> Vec<NodeTopology> {
        let n = node_count as usize;
        (0..node_count)
            .map(|address| {
                let region = Region::ALL[self.rng.gen_range(0..Region::ALL.len())];
                let (down_mbps, up_mbps) = regional_speed_mbps(region);

                let degree = if n <= 1 {
                    0
                } else {
                    self.rng
                        .gen_range(self.min_connections..=self.max_connections)
                        .min(n - 1)
                };

                let mut peers = Vec::with_capacity(degree);
                while peers.len() < degree {
                    let candidate = self.rng.gen_range(0..node_count);
                    if candidate != address && !peers.contains(&candidate) {
                        peers.push(candidate);
                    }
                }

                NodeTopology {
                    address,
                    region,
                    peers,
                    download_speed: mbps_to_bytes_per_sec(down_mbps),
                    upload_speed: mbps_to_bytes_per_sec(up_mbps),
                }
            })
            .collect()
    }
}
