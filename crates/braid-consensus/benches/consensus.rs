//! Consensus Benchmarks for Braid
//!
//! Run with: `cargo bench --package braid-consensus --bench consensus`

use braid_consensus::{commit_channel, ConsensusConfig, Hashgraph};
use braid_core::{Block, Event, EventBody, EventHash, Participants, Peer};
use braid_crypto::KeyPair;
use braid_storage::InMemStore;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;

// ============================================================================
// FIXTURES
// ============================================================================

fn keypairs(n: usize) -> Vec<KeyPair> {
    (0..n)
        .map(|i| KeyPair::from_seed([i as u8 + 1; 32]))
        .collect()
}

fn participants(keys: &[KeyPair]) -> Participants {
    Participants::from_peers(
        keys.iter()
            .map(|k| Peer::new(k.public_key(), "127.0.0.1:0")),
    )
    .unwrap()
}

/// Creators take turns, each event pointing at the previous one
fn zigzag(keys: &[KeyPair], count: usize) -> Vec<Event> {
    let mut heads: Vec<(EventHash, i64)> = keys
        .iter()
        .map(|k| (EventHash::root_marker(Peer::id_for(&k.public_key())), -1))
        .collect();
    let mut events: Vec<Event> = Vec::with_capacity(count);

    for i in 0..count {
        let creator = i % keys.len();
        let (self_parent, index) = heads[creator];
        let mut event = Event::from_body(EventBody {
            transactions: vec![format!("tx{i}").into_bytes()],
            block_signatures: Vec::new(),
            self_parent,
            other_parent: events.last().map(Event::hash),
            creator: keys[creator].public_key(),
            index: index + 1,
            timestamp: i as i64,
        });
        event.sign(&keys[creator]);
        heads[creator] = (event.hash(), index + 1);
        events.push(event);
    }
    events
}

/// Engine with a commit buffer large enough to never block
fn engine(participants: &Participants) -> (Hashgraph, mpsc::Receiver<Block>) {
    let config = ConsensusConfig {
        commit_buffer: 10_000,
        ..ConsensusConfig::default()
    };
    let store = Arc::new(InMemStore::new(participants, 10_000));
    let (tx, rx) = commit_channel(&config);
    let g = Hashgraph::new(participants.clone(), store, tx, config).unwrap();
    (g, rx)
}

// ============================================================================
// PIPELINE BENCHMARKS
// ============================================================================

fn pipeline_benchmarks(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let mut group = c.benchmark_group("pipeline");

    for &n in &[4usize, 7, 10] {
        let keys = keypairs(n);
        let participants = participants(&keys);
        let events = zigzag(&keys, 40 * n);

        group.throughput(Throughput::Elements(events.len() as u64));
        group.bench_with_input(BenchmarkId::new("insert_and_consensus", n), &events, |b, events| {
            b.iter(|| {
                let (mut g, _commits) = engine(&participants);
                for event in events {
                    g.insert_event(event.clone(), true).unwrap();
                }
                runtime.block_on(g.run_consensus()).unwrap();
                g.stats()
            })
        });
    }

    group.finish();
}

// ============================================================================
// ANCESTRY BENCHMARKS
// ============================================================================

fn ancestry_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("ancestry");

    let keys = keypairs(7);
    let participants = participants(&keys);
    let events = zigzag(&keys, 280);
    let first = events[0].hash();
    let last = events[events.len() - 1].hash();

    group.bench_function("strongly_see_uncached", |b| {
        b.iter_batched(
            || {
                let (mut g, commits) = engine(&participants);
                for event in &events {
                    g.insert_event(event.clone(), true).unwrap();
                }
                (g, commits)
            },
            |(mut g, _commits)| g.strongly_see(&last, &first).unwrap(),
            criterion::BatchSize::LargeInput,
        )
    });

    group.bench_function("insert_event", |b| {
        b.iter_batched(
            || engine(&participants),
            |(mut g, commits)| {
                for event in &events {
                    g.insert_event(event.clone(), true).unwrap();
                }
                (g, commits)
            },
            criterion::BatchSize::LargeInput,
        )
    });

    group.finish();
}

criterion_group!(benches, pipeline_benchmarks, ancestry_benchmarks);
criterion_main!(benches);
