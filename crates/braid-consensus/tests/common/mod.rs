//! Shared fixtures for the consensus integration tests

#![allow(dead_code)]

use braid_consensus::{commit_channel, ConsensusConfig, Hashgraph};
use braid_core::{
    Block, BlockSignature, BraidError, Event, EventBody, EventHash, Frame, LastEvent,
    Participants, Peer, PublicKey, Result, Root, RoundInfo, Store,
};
use braid_crypto::KeyPair;
use braid_storage::InMemStore;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

pub const CACHE_SIZE: usize = 1_000;

/// Route engine logs to the test harness; `RUST_LOG` selects the level
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Deterministic keys, one per participant
pub fn keypairs(n: usize) -> Vec<KeyPair> {
    (0..n)
        .map(|i| KeyPair::from_seed([i as u8 + 1; 32]))
        .collect()
}

pub fn participants(keys: &[KeyPair]) -> Participants {
    Participants::from_peers(
        keys.iter()
            .enumerate()
            .map(|(i, k)| Peer::new(k.public_key(), format!("127.0.0.1:{}", 9000 + i))),
    )
    .expect("participant set")
}

/// An engine over a test store with its commit receiver
pub struct TestNode<S: Store = InMemStore> {
    pub engine: Hashgraph,
    pub store: Arc<S>,
    pub commits: mpsc::Receiver<Block>,
}

impl TestNode {
    pub fn new(participants: Participants) -> Self {
        Self::with_config(participants, ConsensusConfig::default())
    }

    pub fn with_config(participants: Participants, config: ConsensusConfig) -> Self {
        let store = Arc::new(InMemStore::new(&participants, CACHE_SIZE));
        TestNode::with_store(participants, store, config)
    }
}

impl TestNode<FlakyStore> {
    pub fn flaky(participants: Participants) -> Self {
        let store = Arc::new(FlakyStore::new(&participants));
        TestNode::with_store(participants, store, ConsensusConfig::default())
    }
}

impl<S: Store + 'static> TestNode<S> {
    pub fn with_store(participants: Participants, store: Arc<S>, config: ConsensusConfig) -> Self {
        init_tracing();
        let (tx, commits) = commit_channel(&config);
        let engine = Hashgraph::new(participants, store.clone(), tx, config).expect("engine");
        Self {
            engine,
            store,
            commits,
        }
    }

    pub fn insert_all(&mut self, events: &[Event]) {
        for event in events {
            self.engine
                .insert_event(event.clone(), true)
                .expect("insert event");
        }
    }

    /// Blocks committed so far, in commit order
    pub fn drain_blocks(&mut self) -> Vec<Block> {
        let mut blocks = Vec::new();
        while let Ok(block) = self.commits.try_recv() {
            blocks.push(block);
        }
        blocks
    }
}

/// In-memory store whose writes fail on demand
pub struct FlakyStore {
    inner: InMemStore,
    /// Countdown to the failing `set_event` call; 0 when disarmed
    set_event_failure: AtomicUsize,
    set_block_failure: AtomicBool,
}

impl FlakyStore {
    pub fn new(participants: &Participants) -> Self {
        Self {
            inner: InMemStore::new(participants, CACHE_SIZE),
            set_event_failure: AtomicUsize::new(0),
            set_block_failure: AtomicBool::new(false),
        }
    }

    /// Fail the `calls`-th `set_event` from now, once
    pub fn fail_set_event_in(&self, calls: usize) {
        self.set_event_failure.store(calls, Ordering::SeqCst);
    }

    /// Fail the next `set_block`, once
    pub fn fail_next_set_block(&self) {
        self.set_block_failure.store(true, Ordering::SeqCst);
    }

    fn injected(operation: &str) -> BraidError {
        BraidError::Storage(format!("injected {operation} failure"))
    }
}

impl Store for FlakyStore {
    fn cache_size(&self) -> usize {
        self.inner.cache_size()
    }

    fn get_event(&self, hash: &EventHash) -> Result<Event> {
        self.inner.get_event(hash)
    }

    fn set_event(&self, event: Event) -> Result<()> {
        let countdown = self.set_event_failure.load(Ordering::SeqCst);
        if countdown > 0 {
            self.set_event_failure.store(countdown - 1, Ordering::SeqCst);
            if countdown == 1 {
                return Err(Self::injected("set_event"));
            }
        }
        self.inner.set_event(event)
    }

    fn participant_event(&self, participant: &PublicKey, index: i64) -> Result<EventHash> {
        self.inner.participant_event(participant, index)
    }

    fn last_event_from(&self, participant: &PublicKey) -> Result<LastEvent> {
        self.inner.last_event_from(participant)
    }

    fn last_consensus_event_from(&self, participant: &PublicKey) -> Result<Option<EventHash>> {
        self.inner.last_consensus_event_from(participant)
    }

    fn add_consensus_event(&self, event: &Event) -> Result<()> {
        self.inner.add_consensus_event(event)
    }

    fn consensus_events(&self) -> Vec<EventHash> {
        self.inner.consensus_events()
    }

    fn consensus_events_count(&self) -> usize {
        self.inner.consensus_events_count()
    }

    fn get_round(&self, round: i64) -> Result<RoundInfo> {
        self.inner.get_round(round)
    }

    fn set_round(&self, round: i64, info: RoundInfo) -> Result<()> {
        self.inner.set_round(round, info)
    }

    fn last_round(&self) -> i64 {
        self.inner.last_round()
    }

    fn round_witnesses(&self, round: i64) -> Vec<EventHash> {
        self.inner.round_witnesses(round)
    }

    fn get_root(&self, participant: &PublicKey) -> Result<Root> {
        self.inner.get_root(participant)
    }

    fn roots_by_self_parent(&self) -> Result<HashMap<EventHash, Root>> {
        self.inner.roots_by_self_parent()
    }

    fn get_block(&self, index: i64) -> Result<Block> {
        self.inner.get_block(index)
    }

    fn set_block(&self, block: Block) -> Result<()> {
        if self.set_block_failure.swap(false, Ordering::SeqCst) {
            return Err(Self::injected("set_block"));
        }
        self.inner.set_block(block)
    }

    fn last_block_index(&self) -> i64 {
        self.inner.last_block_index()
    }

    fn get_frame(&self, round: i64) -> Result<Frame> {
        self.inner.get_frame(round)
    }

    fn set_frame(&self, frame: Frame) -> Result<()> {
        self.inner.set_frame(frame)
    }

    fn reset(&self, roots: BTreeMap<PublicKey, Root>) -> Result<()> {
        self.inner.reset(roots)
    }
}

/// Builds signed DAGs with deterministic timestamps.
///
/// Creators are addressed by their position in the key list. Named events
/// carry their name as their only transaction.
pub struct DagBuilder {
    keys: Vec<KeyPair>,
    heads: Vec<(EventHash, i64)>,
    names: HashMap<String, EventHash>,
    clock: i64,
    pub events: Vec<Event>,
}

impl DagBuilder {
    pub fn new(keys: Vec<KeyPair>) -> Self {
        let heads = keys
            .iter()
            .map(|k| (EventHash::root_marker(Peer::id_for(&k.public_key())), -1))
            .collect();
        Self {
            keys,
            heads,
            names: HashMap::new(),
            clock: 1_700_000_000_000,
            events: Vec::new(),
        }
    }

    pub fn key(&self, creator: usize) -> &KeyPair {
        &self.keys[creator]
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Last event of `creator`, if it has any
    pub fn head(&self, creator: usize) -> Option<EventHash> {
        let (hash, index) = self.heads[creator];
        (index >= 0).then_some(hash)
    }

    /// Append an event extending `creator`'s chain
    pub fn add(
        &mut self,
        creator: usize,
        other_parent: Option<EventHash>,
        transactions: Vec<Vec<u8>>,
        block_signatures: Vec<BlockSignature>,
    ) -> Event {
        let (self_parent, last_index) = self.heads[creator];
        self.clock += 1;
        let mut event = Event::from_body(EventBody {
            transactions,
            block_signatures,
            self_parent,
            other_parent,
            creator: self.keys[creator].public_key(),
            index: last_index + 1,
            timestamp: self.clock,
        });
        event.sign(&self.keys[creator]);

        self.heads[creator] = (event.hash(), last_index + 1);
        self.events.push(event.clone());
        event
    }

    /// Append a named event whose other-parent is another named event
    pub fn play(&mut self, name: &str, creator: usize, other_parent: Option<&str>) -> Event {
        let other_parent = other_parent.map(|other| self.hash(other));
        let event = self.add(creator, other_parent, vec![name.as_bytes().to_vec()], Vec::new());
        self.names.insert(name.to_string(), event.hash());
        event
    }

    pub fn hash(&self, name: &str) -> EventHash {
        *self
            .names
            .get(name)
            .unwrap_or_else(|| panic!("unknown event {name}"))
    }

    /// Next event of the zigzag pattern: creators take turns and each event
    /// points at the previous one, so every event sees the whole history.
    /// When `sign` is given the creator also signs that block.
    pub fn zigzag_step(&mut self, sign: Option<&Block>) -> Event {
        let position = self.events.len();
        let creator = position % self.keys.len();
        let other_parent = self.events.last().map(Event::hash);
        let block_signatures = sign
            .map(|block| vec![block.sign(&self.keys[creator])])
            .unwrap_or_default();
        self.add(
            creator,
            other_parent,
            vec![zigzag_transaction(position)],
            block_signatures,
        )
    }

    pub fn zigzag(&mut self, count: usize) -> Vec<Event> {
        (0..count).map(|_| self.zigzag_step(None)).collect()
    }
}

pub fn zigzag_transaction(position: usize) -> Vec<u8> {
    format!("tx{position}").into_bytes()
}

/// Transactions of `blocks` flattened in commit order
pub fn committed_transactions(blocks: &[Block]) -> Vec<Vec<u8>> {
    blocks
        .iter()
        .flat_map(|block| block.transactions().iter().cloned())
        .collect()
}
