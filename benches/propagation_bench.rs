//! Benchmarks for the event-queue, codec and bandwidth-accounting hot
//! paths that a full network run spends most of its time in.
//!
//! Run with: cargo bench

use blocksim::network::peer_link::BandwidthLedger;
use blocksim::network::PeerAddress;
use blocksim::protocol::codec;
use blocksim::protocol::NetworkMessage;
use blocksim::sim::clock::{EventKind, EventQueue};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_event_queue_schedule_and_drain(c: &mut Criterion) {
    c.bench_function("event_queue_schedule_and_drain_1000", |b| {
        b.iter(|| {
            let mut queue = EventQueue::new();
            for i in 0..1000u64 {
                queue.schedule(black_box(i as f64), EventKind::ClientTransactionTimer { node: i });
            }
            let mut count = 0;
            while queue.pop_next().is_some() {
                count += 1;
            }
            black_box(count)
        })
    });
}

fn bench_event_queue_cancel(c: &mut Criterion) {
    c.bench_function("event_queue_schedule_cancel_half", |b| {
        b.iter(|| {
            let mut queue = EventQueue::new();
            let mut ids = Vec::with_capacity(1000);
            for i in 0..1000u64 {
                ids.push(queue.schedule(i as f64, EventKind::ClientTransactionTimer { node: i }));
            }
            for id in ids.into_iter().step_by(2) {
                queue.cancel(id);
            }
            let mut count = 0;
            while queue.pop_next().is_some() {
                count += 1;
            }
            black_box(count)
        })
    });
}

fn bench_codec_round_trip(c: &mut Criterion) {
    let hashes: Vec<String> = (0..20).map(|i| format!("{i}/1")).collect();
    let message = NetworkMessage::inv(hashes);

    c.bench_function("codec_encode_feed_round_trip", |b| {
        b.iter(|| {
            let framed = codec::encode(black_box(&message)).unwrap();
            let mut buffer = String::new();
            black_box(codec::feed(&mut buffer, &framed))
        })
    });
}

fn bench_bandwidth_ledger_serialized_sends(c: &mut Criterion) {
    c.bench_function("bandwidth_ledger_1000_serialized_block_sends", |b| {
        b.iter(|| {
            let mut ledger = BandwidthLedger::new();
            let mut now = 0.0;
            for _ in 0..1000 {
                now = ledger.schedule(now, 23_000, 1_000_000.0);
                ledger.retire_before(now - 10.0);
            }
            black_box(now)
        })
    });
}

fn bench_peer_link_bottleneck(c: &mut Criterion) {
    let links: Vec<(f64, f64)> = (0..1000).map(|i| (1_000_000.0 + i as f64, 500_000.0 + i as f64)).collect();

    c.bench_function("bottleneck_speed_1000_pairs", |b| {
        b.iter(|| {
            let mut total = 0.0;
            for &(upload, download) in &links {
                total += blocksim::network::peer_link::bottleneck_speed(black_box(upload), black_box(download));
            }
            black_box(total)
        })
    });
}

fn bench_world_gossip_step(c: &mut Criterion) {
    use blocksim::config::SimConfig;
    use blocksim::sim::World;

    let config = SimConfig {
        nodes: 20,
        miners: 2,
        endorsers: 4,
        clients: 4,
        orders: 0,
        fixed_block_interval: true,
        block_interval_seconds: 2.0,
        ..SimConfig::default()
    };

    c.bench_function("world_run_200_steps_20_nodes", |b| {
        b.iter(|| {
            let mut world = World::from_config(&config).unwrap();
            world.start_all();
            let mut steps = 0;
            while steps < 200 && world.step() {
                steps += 1;
            }
            black_box(steps)
        })
    });
}

fn bench_peer_address_hashing(c: &mut Criterion) {
    use std::collections::HashMap;
    c.bench_function("peer_address_map_insert_1000", |b| {
        b.iter(|| {
            let mut map: HashMap<PeerAddress, u64> = HashMap::new();
            for i in 0..1000u64 {
                map.insert(i, i * 2);
            }
            black_box(map.len())
        })
    });
}

criterion_group!(
    benches,
    bench_event_queue_schedule_and_drain,
    bench_event_queue_cancel,
    bench_codec_round_trip,
    bench_bandwidth_ledger_serialized_sends,
    bench_peer_link_bottleneck,
    bench_world_gossip_step,
    bench_peer_address_hashing,
);
criterion_main!(benches);
