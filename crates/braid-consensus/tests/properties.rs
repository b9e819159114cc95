//! Structural invariants over random DAGs

mod common;

use braid_core::{Event, Store};
use common::{keypairs, participants, DagBuilder, TestNode};
use proptest::prelude::*;

const N: usize = 4;

/// Each step is (creator, peer): the creator extends its chain and points
/// at the peer's last event when the peer has one
fn random_dag(steps: &[(usize, usize)]) -> Vec<Event> {
    let mut dag = DagBuilder::new(keypairs(N));
    for (i, &(creator, peer)) in steps.iter().enumerate() {
        let other_parent = if peer != creator { dag.head(peer) } else { None };
        dag.add(creator, other_parent, vec![vec![i as u8]], Vec::new());
    }
    dag.events
}

fn steps() -> impl Strategy<Value = Vec<(usize, usize)>> {
    prop::collection::vec((0..N, 0..N), 1..80)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_rounds_and_lamport_follow_parents(steps in steps()) {
        let events = random_dag(&steps);
        let mut node = TestNode::new(participants(&keypairs(N)));
        node.insert_all(&events);
        node.engine.divide_rounds().unwrap();

        for event in &events {
            let hash = event.hash();
            let round = node.engine.round(&hash).unwrap();
            let lamport = node.engine.lamport_timestamp(&hash).unwrap();
            let witness = node.engine.witness(&hash).unwrap();

            prop_assert!(node.engine.ancestor(&hash, &hash).unwrap());
            prop_assert!(node.engine.self_ancestor(&hash, &hash).unwrap());

            let (self_parent_round, self_parent_lamport) = match node.store.get_event(event.self_parent()) {
                Ok(_) => (
                    node.engine.round(event.self_parent()).unwrap(),
                    node.engine.lamport_timestamp(event.self_parent()).unwrap(),
                ),
                Err(_) => (-1, -1),
            };
            prop_assert!(round >= self_parent_round);
            prop_assert!(lamport > self_parent_lamport);
            prop_assert_eq!(witness, round > self_parent_round);

            let mut parent_round = self_parent_round;
            if let Some(other_parent) = event.other_parent() {
                let other_round = node.engine.round(other_parent).unwrap();
                prop_assert!(round >= other_round);
                prop_assert!(lamport > node.engine.lamport_timestamp(other_parent).unwrap());
                prop_assert!(node.engine.ancestor(&hash, other_parent).unwrap());
                parent_round = parent_round.max(other_round);
            }
            prop_assert!(round <= parent_round.max(0) + 1);
        }
    }

    #[test]
    fn prop_incremental_rounds_match_batch(steps in steps()) {
        let events = random_dag(&steps);

        let mut batch = TestNode::new(participants(&keypairs(N)));
        batch.insert_all(&events);
        batch.engine.divide_rounds().unwrap();

        let mut incremental = TestNode::new(participants(&keypairs(N)));
        for event in &events {
            incremental.engine.insert_event(event.clone(), true).unwrap();
            incremental.engine.divide_rounds().unwrap();
        }

        for event in &events {
            let a = batch.store.get_event(&event.hash()).unwrap();
            let b = incremental.store.get_event(&event.hash()).unwrap();
            prop_assert_eq!(a.round(), b.round());
            prop_assert_eq!(a.lamport_timestamp(), b.lamport_timestamp());
            prop_assert_eq!(a.last_ancestors(), b.last_ancestors());
            prop_assert_eq!(a.first_descendants(), b.first_descendants());
        }
        for round in 0..=batch.store.last_round() {
            prop_assert_eq!(
                batch.store.round_witnesses(round),
                incremental.store.round_witnesses(round)
            );
        }
    }

    #[test]
    fn prop_round_received_after_round(steps in steps()) {
        let events = random_dag(&steps);
        let mut node = TestNode::new(participants(&keypairs(N)));
        node.insert_all(&events);
        node.engine.divide_rounds().unwrap();
        node.engine.decide_fame().unwrap();
        node.engine.decide_round_received().unwrap();

        for event in &events {
            let hash = event.hash();
            let stored = node.store.get_event(&hash).unwrap();
            if let Some(received) = stored.round_received() {
                prop_assert!(received > stored.round().unwrap());

                let info = node.store.get_round(received).unwrap();
                prop_assert!(info.witnesses_decided());
                let famous = info.famous_witnesses();
                prop_assert!(!famous.is_empty());
                for w in famous {
                    prop_assert!(node.engine.see(&w, &hash).unwrap());
                }
            }
        }
    }
}
