//! In-memory store
//!
//! Append-only event arena keyed by hash, with per-participant index lists
//! offset by the participant's root:
//!
//! ```text
//!   root.self_parent.index = k
//!   participant_events[p] = [ev(k+1), ev(k+2), ...]
//! ```

use braid_core::{
    Block, BraidError, Event, EventHash, Frame, LastEvent, Participants, PublicKey, Result, Root,
    RoundInfo, Store,
};
use hashbrown::{HashMap, HashSet};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap as StdHashMap};
use tracing::debug;

/// Event arena and per-participant indexes
#[derive(Default)]
struct EventArena {
    events: HashMap<EventHash, Event>,
    participant_events: HashMap<PublicKey, Vec<EventHash>>,
}

/// Consensus history since the last reset
#[derive(Default)]
struct ConsensusLog {
    events: Vec<EventHash>,
    logged: HashSet<EventHash>,
    last_from: HashMap<PublicKey, EventHash>,
}

/// Reference [`Store`] keeping everything in memory
pub struct InMemStore {
    cache_size: usize,
    arena: RwLock<EventArena>,
    roots: RwLock<BTreeMap<PublicKey, Root>>,
    rounds: RwLock<BTreeMap<i64, RoundInfo>>,
    blocks: RwLock<BTreeMap<i64, Block>>,
    frames: RwLock<HashMap<i64, Frame>>,
    consensus: RwLock<ConsensusLog>,
}

impl InMemStore {
    /// Store with a genesis root for every participant
    pub fn new(participants: &Participants, cache_size: usize) -> Self {
        let roots = participants
            .peers()
            .map(|peer| (peer.pub_key, Root::base(peer.id)))
            .collect();
        Self::with_roots(roots, cache_size)
    }

    /// Store starting from the given roots
    pub fn with_roots(roots: BTreeMap<PublicKey, Root>, cache_size: usize) -> Self {
        Self {
            cache_size,
            arena: RwLock::new(EventArena::default()),
            roots: RwLock::new(roots),
            rounds: RwLock::new(BTreeMap::new()),
            blocks: RwLock::new(BTreeMap::new()),
            frames: RwLock::new(HashMap::new()),
            consensus: RwLock::new(ConsensusLog::default()),
        }
    }

    /// Number of stored events
    pub fn event_count(&self) -> usize {
        self.arena.read().events.len()
    }

    fn root_of(&self, participant: &PublicKey) -> Result<Root> {
        self.roots
            .read()
            .get(participant)
            .cloned()
            .ok_or_else(|| BraidError::not_found("Root", participant.to_hex()))
    }
}

impl Store for InMemStore {
    fn cache_size(&self) -> usize {
        self.cache_size
    }

    fn get_event(&self, hash: &EventHash) -> Result<Event> {
        self.arena
            .read()
            .events
            .get(hash)
            .cloned()
            .ok_or(BraidError::UnknownEvent(*hash))
    }

    fn set_event(&self, event: Event) -> Result<()> {
        let mut arena = self.arena.write();
        let hash = event.hash();
        if !arena.events.contains_key(&hash) {
            arena
                .participant_events
                .entry(*event.creator())
                .or_default()
                .push(hash);
        }
        arena.events.insert(hash, event);
        Ok(())
    }

    fn participant_event(&self, participant: &PublicKey, index: i64) -> Result<EventHash> {
        let root = self.root_of(participant)?;
        if index == root.self_parent.index {
            return Ok(root.self_parent.hash);
        }
        let not_found = || BraidError::not_found("ParticipantEvent", format!("{}:{}", participant, index));
        let offset = index - root.self_parent.index - 1;
        if offset < 0 {
            return Err(not_found());
        }
        self.arena
            .read()
            .participant_events
            .get(participant)
            .and_then(|events| events.get(offset as usize))
            .copied()
            .ok_or_else(not_found)
    }

    fn last_event_from(&self, participant: &PublicKey) -> Result<LastEvent> {
        if let Some(hash) = self
            .arena
            .read()
            .participant_events
            .get(participant)
            .and_then(|events| events.last())
        {
            return Ok(LastEvent {
                hash: *hash,
                is_root: false,
            });
        }
        let root = self.root_of(participant)?;
        Ok(LastEvent {
            hash: root.self_parent.hash,
            is_root: true,
        })
    }

    fn last_consensus_event_from(&self, participant: &PublicKey) -> Result<Option<EventHash>> {
        Ok(self.consensus.read().last_from.get(participant).copied())
    }

    fn add_consensus_event(&self, event: &Event) -> Result<()> {
        let mut consensus = self.consensus.write();
        if !consensus.logged.insert(event.hash()) {
            return Ok(());
        }
        consensus.events.push(event.hash());
        consensus.last_from.insert(*event.creator(), event.hash());
        Ok(())
    }

    fn consensus_events(&self) -> Vec<EventHash> {
        self.consensus.read().events.clone()
    }

    fn consensus_events_count(&self) -> usize {
        self.consensus.read().events.len()
    }

    fn get_round(&self, round: i64) -> Result<RoundInfo> {
        self.rounds
            .read()
            .get(&round)
            .cloned()
            .ok_or_else(|| BraidError::not_found("Round", round))
    }

    fn set_round(&self, round: i64, info: RoundInfo) -> Result<()> {
        self.rounds.write().insert(round, info);
        Ok(())
    }

    fn last_round(&self) -> i64 {
        self.rounds.read().keys().next_back().copied().unwrap_or(-1)
    }

    fn round_witnesses(&self, round: i64) -> Vec<EventHash> {
        self.rounds
            .read()
            .get(&round)
            .map(RoundInfo::witnesses)
            .unwrap_or_default()
    }

    fn get_root(&self, participant: &PublicKey) -> Result<Root> {
        self.root_of(participant)
    }

    fn roots_by_self_parent(&self) -> Result<StdHashMap<EventHash, Root>> {
        Ok(self
            .roots
            .read()
            .values()
            .map(|root| (root.self_parent.hash, root.clone()))
            .collect())
    }

    fn get_block(&self, index: i64) -> Result<Block> {
        self.blocks
            .read()
            .get(&index)
            .cloned()
            .ok_or_else(|| BraidError::not_found("Block", index))
    }

    fn set_block(&self, block: Block) -> Result<()> {
        self.blocks.write().insert(block.index(), block);
        Ok(())
    }

    fn last_block_index(&self) -> i64 {
        self.blocks.read().keys().next_back().copied().unwrap_or(-1)
    }

    fn get_frame(&self, round: i64) -> Result<Frame> {
        self.frames
            .read()
            .get(&round)
            .cloned()
            .ok_or_else(|| BraidError::not_found("Frame", round))
    }

    fn set_frame(&self, frame: Frame) -> Result<()> {
        self.frames.write().insert(frame.round, frame);
        Ok(())
    }

    fn reset(&self, roots: BTreeMap<PublicKey, Root>) -> Result<()> {
        debug!(roots = roots.len(), "Resetting in-memory store");
        *self.arena.write() = EventArena::default();
        *self.rounds.write() = BTreeMap::new();
        self.frames.write().clear();
        *self.consensus.write() = ConsensusLog::default();
        *self.roots.write() = roots;
        Ok(())
    }
}
