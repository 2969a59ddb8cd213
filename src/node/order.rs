//! Hyperledger-style `order` role (§4.9): periodically cuts a block from
//! `not_validated_transactions` on a fixed cadence, gated on endorsement
//! rather than proof-of-work. Block-cutting itself reuses
//! [`super::miner::on_mining_timer`] — an order node is just a
//! [`super::miner::MiningSchedule::Fixed`] schedule attached to a
//! `NodeRole::Order` node rather than a `NodeRole::Committer` one, so it
//! shares the same assembly/gossip path without being counted toward the
//! PoW-miner statistics fields (`Node::is_pow_miner`).

use super::miner::MiningSchedule;

pub const DEFAULT_ORDERING_INTERVAL_SECONDS: f64 = 5.0;

pub fn fixed_schedule(interval_seconds: f64) -> MiningSchedule {
    MiningSchedule::Fixed { interval_seconds }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_schedule_is_deterministic() {
        use rand::rngs::StdRng;
        use rand::SeedableRng;
        let schedule = fixed_schedule(DEFAULT_ORDERING_INTERVAL_SECONDS);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(schedule.sample_interval(&mut rng), DEFAULT_ORDERING_INTERVAL_SECONDS);
    }
}
