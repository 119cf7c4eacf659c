use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rpl_multipath_core::{
    CongestionEstimator, CountersSnapshot, PacketCounters, SelectionPolicy,
    neighbor::{NeighborArena, NeighborTable as _},
    route::select_alternate,
};
use rand_chacha::ChaChaRng;
use rand_core::SeedableRng as _;
use std::net::Ipv6Addr;

const NEIGHBORS: u16 = 16;

fn neighbors() -> NeighborArena {
    let mut table = NeighborArena::with_capacity(NEIGHBORS as usize);
    for i in 0..NEIGHBORS {
        let address = Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, i + 1);
        let neighbor = table.insert(address, true).unwrap();
        table.set_congested(neighbor, i % 3 == 0);
    }
    let parent = table.neighbors().next();
    table.set_preferred_parent(parent).unwrap();
    table
}

fn counters(c: &mut Criterion) {
    let counters = PacketCounters::new();

    c.bench_function("record_rx", |b| b.iter(|| counters.record_rx()));
    c.bench_function("take_and_reset_tx", |b| {
        b.iter(|| {
            counters.record_tx();
            counters.take_and_reset_tx()
        })
    });
}

fn evaluate(c: &mut Criterion) {
    let estimator = CongestionEstimator::default();
    let table = neighbors();
    let uncongested = CountersSnapshot {
        rx: 100,
        rx_expected: 100,
        tx_toward_parent: 0,
    };

    c.bench_function("evaluate_neighbor_scan", |b| {
        b.iter(|| estimator.evaluate(black_box(&uncongested), &table))
    });
}

fn selection(c: &mut Criterion) {
    let table = neighbors();
    let Some(parent) = table.preferred_parent() else {
        return;
    };
    let mut rng = ChaChaRng::seed_from_u64(0);

    c.bench_function("select_deterministic", |b| {
        b.iter(|| select_alternate(SelectionPolicy::Deterministic, &table, parent, &mut rng))
    });
    c.bench_function("select_randomized", |b| {
        b.iter(|| select_alternate(SelectionPolicy::randomized(), &table, parent, &mut rng))
    });
}

criterion_group!(benches, counters, evaluate, selection);
criterion_main!(benches);
