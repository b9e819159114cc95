//! # Hashgraph Engine
//!
//! Owner of all mutable consensus state. Events enter through
//! [`Hashgraph::insert_event`]; [`Hashgraph::run_consensus`] then advances
//! the pipeline:
//!
//! ```text
//! insert_event ─► divide_rounds ─► decide_fame ─► decide_round_received
//!                                                         │
//!      commit channel ◄── process_decided_rounds ◄────────┘
//!                                  │
//!                          process_sig_pool ─► anchor block
//! ```
//!
//! The engine is single-writer: every step takes `&mut self` and reads then
//! writes round and fame state across several store calls.

use braid_core::{
    constants, Block, BlockSignature, BraidError, CoordinateTable, Event, EventBody,
    EventCoordinates, EventHash, ParticipantId, Participants, PendingRound, PublicKey, Result,
    Root, SignedEvent, Store, WireEvent, WireInfo, WireParent,
};
use hashbrown::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use crate::cache::EngineCaches;
use crate::config::ConsensusConfig;
use crate::stats::ConsensusStats;

/// Hashgraph consensus engine
pub struct Hashgraph {
    pub(crate) participants: Participants,
    pub(crate) store: Arc<dyn Store>,
    pub(crate) commit_tx: mpsc::Sender<Block>,
    pub(crate) config: ConsensusConfig,

    /// Events without a round received, in insertion order
    pub(crate) undetermined_events: Vec<EventHash>,

    /// Rounds awaiting fame decision or commit, ascending
    pub(crate) pending_rounds: VecDeque<PendingRound>,

    /// Block signatures collected from inserted events
    pub(crate) sig_pool: Vec<BlockSignature>,

    /// Roots keyed by the hash of their self-parent marker
    pub(crate) roots_by_self_parent: HashMap<EventHash, Root>,

    pub(crate) last_consensus_round: Option<i64>,
    pub(crate) first_consensus_round: Option<i64>,
    pub(crate) anchor_block: Option<i64>,
    pub(crate) consensus_transactions: u64,
    pub(crate) pending_loaded_events: i64,
    pub(crate) topological_index: u64,

    /// Votes taken from the coin in split coin rounds
    pub(crate) coin_votes: u64,

    pub(crate) caches: EngineCaches,
}

impl Hashgraph {
    /// Create an engine over `store`, committing blocks to `commit_tx`
    pub fn new(
        participants: Participants,
        store: Arc<dyn Store>,
        commit_tx: mpsc::Sender<Block>,
        config: ConsensusConfig,
    ) -> Result<Self> {
        config.validate()?;
        if participants.is_empty() {
            return Err(BraidError::InvalidInput("empty participant set".into()));
        }
        let cache_size = config.cache_size.unwrap_or_else(|| store.cache_size());
        let roots_by_self_parent = store.roots_by_self_parent()?.into_iter().collect();

        Ok(Self {
            participants,
            store,
            commit_tx,
            config,
            undetermined_events: Vec::new(),
            pending_rounds: VecDeque::new(),
            sig_pool: Vec::new(),
            roots_by_self_parent,
            last_consensus_round: None,
            first_consensus_round: None,
            anchor_block: None,
            consensus_transactions: 0,
            pending_loaded_events: 0,
            topological_index: 0,
            coin_votes: 0,
            caches: EngineCaches::new(cache_size),
        })
    }

    // === Accessors ===

    pub fn participants(&self) -> &Participants {
        &self.participants
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    pub fn last_consensus_round(&self) -> Option<i64> {
        self.last_consensus_round
    }

    pub fn first_consensus_round(&self) -> Option<i64> {
        self.first_consensus_round
    }

    pub fn anchor_block(&self) -> Option<i64> {
        self.anchor_block
    }

    pub fn undetermined_events(&self) -> &[EventHash] {
        &self.undetermined_events
    }

    pub fn pending_rounds(&self) -> impl Iterator<Item = &PendingRound> {
        self.pending_rounds.iter()
    }

    pub(crate) fn cache_size(&self) -> usize {
        self.config
            .cache_size
            .unwrap_or_else(|| self.store.cache_size())
    }

    /// Current counters
    pub fn stats(&self) -> ConsensusStats {
        ConsensusStats {
            undetermined_events: self.undetermined_events.len(),
            pending_rounds: self.pending_rounds.len(),
            consensus_events: self.store.consensus_events_count(),
            consensus_transactions: self.consensus_transactions,
            pending_loaded_events: self.pending_loaded_events,
            last_consensus_round: self.last_consensus_round,
            first_consensus_round: self.first_consensus_round,
            last_block_index: self.store.last_block_index(),
            anchor_block: self.anchor_block,
            sig_pool: self.sig_pool.len(),
            coin_votes: self.coin_votes,
        }
    }

    // ========================================================================
    // Insertion
    // ========================================================================

    /// Validate and insert an event.
    ///
    /// Checks run in order: duplicate, creator membership, signature,
    /// self-parent continuity, other-parent availability. On success the
    /// event is stored with its coordinate tables and queued for consensus.
    pub fn insert_event(&mut self, event: Event, set_wire_info: bool) -> Result<()> {
        let event = self.link_event(event, set_wire_info)?;

        self.undetermined_events.push(event.hash());
        if event.is_loaded() {
            self.pending_loaded_events += 1;
        }
        self.sig_pool
            .extend(event.block_signatures().iter().cloned());
        Ok(())
    }

    /// Validation and coordinate bookkeeping shared by regular insertion and
    /// reset. Returns the stored event.
    pub(crate) fn link_event(&mut self, mut event: Event, set_wire_info: bool) -> Result<Event> {
        let hash = event.hash();
        match self.store.get_event(&hash) {
            Ok(_) => return Err(BraidError::DuplicateEvent(hash)),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        let creator_id = self.participants.id_of(event.creator())?;

        match event.verify() {
            Ok(true) => {}
            Ok(false) | Err(BraidError::Crypto(_)) => {
                debug!(event = %hash, "Rejecting event with invalid signature");
                return Err(BraidError::InvalidSignature(hash));
            }
            Err(e) => return Err(e),
        }

        self.check_self_parent(&event)?;
        self.check_other_parent(&event)?;

        if set_wire_info {
            self.set_wire_info(&mut event, creator_id)?;
        }

        self.init_coordinates(&mut event, creator_id)?;
        event.set_topological_index(self.topological_index);

        // The event is stored last: until then a failed insertion can be retried
        self.update_ancestor_first_descendant(&event, creator_id)?;
        self.store.set_event(event.clone())?;
        self.topological_index += 1;

        debug!(
            event = %hash,
            creator = creator_id,
            index = event.index(),
            "Inserted event"
        );
        Ok(event)
    }

    fn check_self_parent(&self, event: &Event) -> Result<()> {
        let last = self.store.last_event_from(event.creator())?;
        let fork = |reason: String| BraidError::ForkDetected {
            creator: *event.creator(),
            index: event.index(),
            reason,
        };

        if *event.self_parent() != last.hash {
            debug!(event = %event.hash(), "Self-parent is not the creator's last event");
            return Err(fork(format!(
                "self-parent {} is not the last known event {}",
                event.self_parent(),
                last.hash
            )));
        }

        let last_index = if last.is_root {
            self.store.get_root(event.creator())?.self_parent.index
        } else {
            self.store.get_event(&last.hash)?.index()
        };
        if event.index() != last_index + 1 {
            return Err(fork(format!(
                "index {} does not follow {}",
                event.index(),
                last_index
            )));
        }
        Ok(())
    }

    fn check_other_parent(&self, event: &Event) -> Result<()> {
        let Some(other_parent) = event.other_parent() else {
            return Ok(());
        };
        match self.store.get_event(other_parent) {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => {
                let root = self.store.get_root(event.creator())?;
                if root.other_for(&event.hash(), other_parent).is_some() {
                    Ok(())
                } else {
                    debug!(event = %event.hash(), other_parent = %other_parent, "Unknown other-parent");
                    Err(BraidError::UnknownParent(*other_parent))
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Seed the coordinate tables from the parents (or the creator's root)
    fn init_coordinates(&self, event: &mut Event, creator_id: ParticipantId) -> Result<()> {
        let ids = self.participants.ids();
        let hash = event.hash();

        let mut last_ancestors = match self.store.get_event(event.self_parent()) {
            Ok(self_parent) => self_parent.last_ancestors().clone(),
            Err(e) if e.is_not_found() => {
                let root = self.store.get_root(event.creator())?;
                let mut table = CoordinateTable::filled(&ids, constants::NO_ANCESTOR);
                if root.self_parent.index > constants::ROOT_SENTINEL {
                    table.set_by_id(
                        creator_id,
                        EventCoordinates {
                            hash: Some(root.self_parent.hash),
                            index: root.self_parent.index,
                        },
                    );
                }
                table
            }
            Err(e) => return Err(e),
        };

        if let Some(other_parent) = event.other_parent() {
            match self.store.get_event(other_parent) {
                Ok(other) => last_ancestors.merge_max(other.last_ancestors()),
                Err(e) if e.is_not_found() => {
                    let root = self.store.get_root(event.creator())?;
                    if let Some(other) = root.other_for(&hash, other_parent) {
                        let known = last_ancestors
                            .get_by_id(other.creator_id)
                            .map(|c| c.index)
                            .unwrap_or(constants::NO_ANCESTOR);
                        if known < other.index {
                            last_ancestors.set_by_id(
                                other.creator_id,
                                EventCoordinates {
                                    hash: Some(other.hash),
                                    index: other.index,
                                },
                            );
                        }
                    }
                }
                Err(e) => return Err(e),
            }
        }

        let own = EventCoordinates {
            hash: Some(hash),
            index: event.index(),
        };
        last_ancestors.set_by_id(creator_id, own);
        let mut first_descendants = CoordinateTable::filled(&ids, constants::NO_DESCENDANT);
        first_descendants.set_by_id(creator_id, own);

        event.set_coordinates(last_ancestors, first_descendants);
        Ok(())
    }

    /// Walk back from each last ancestor along self-parents, recording
    /// `event` as the first descendant from its creator until an ancestor
    /// that already has one.
    ///
    /// Each chain is written oldest first, so an ancestor holding a first
    /// descendant from `creator_id` implies its self-ancestors hold one too,
    /// even after a failed write.
    fn update_ancestor_first_descendant(&self, event: &Event, creator_id: ParticipantId) -> Result<()> {
        let own = EventCoordinates {
            hash: Some(event.hash()),
            index: event.index(),
        };
        for entry in event.last_ancestors().entries() {
            if entry.participant_id == creator_id {
                continue;
            }
            let mut chain = Vec::new();
            let mut cursor = entry.event.hash;
            while let Some(hash) = cursor {
                let mut ancestor = match self.store.get_event(&hash) {
                    Ok(ancestor) => ancestor,
                    Err(e) if e.is_not_found() => break,
                    Err(e) => return Err(e),
                };
                if !ancestor.set_first_descendant(creator_id, own) {
                    break;
                }
                cursor = Some(*ancestor.self_parent());
                chain.push(ancestor);
            }
            for ancestor in chain.into_iter().rev() {
                self.store.set_event(ancestor)?;
            }
        }
        Ok(())
    }

    // ========================================================================
    // Wire format
    // ========================================================================

    fn set_wire_info(&self, event: &mut Event, creator_id: ParticipantId) -> Result<()> {
        let other_parent = match event.other_parent() {
            None => None,
            Some(other_parent) => match self.store.get_event(other_parent) {
                Ok(other) => Some(WireParent {
                    creator_id: self.participants.id_of(other.creator())?,
                    index: other.index(),
                }),
                Err(e) if e.is_not_found() => {
                    let root = self.store.get_root(event.creator())?;
                    let other = root
                        .other_for(&event.hash(), other_parent)
                        .ok_or(BraidError::UnknownParent(*other_parent))?;
                    Some(WireParent {
                        creator_id: other.creator_id,
                        index: other.index,
                    })
                }
                Err(e) => return Err(e),
            },
        };

        event.set_wire_info(WireInfo {
            creator_id,
            self_parent_index: event.index() - 1,
            other_parent,
        });
        Ok(())
    }

    /// Rebuild a full event from its wire form, resolving integer parent
    /// coordinates against the store and the creator's root
    pub fn read_wire_info(&self, wire: WireEvent) -> Result<Event> {
        let body = wire.body;
        let creator = self
            .participants
            .by_id(body.creator_id)
            .ok_or_else(|| BraidError::UnknownParticipant(body.creator_id.to_string()))?
            .pub_key;

        let self_parent = self
            .store
            .participant_event(&creator, body.self_parent_index)?;

        let other_parent = match body.other_parent {
            None => None,
            Some(parent) => Some(self.resolve_wire_parent(&creator, parent)?),
        };

        let block_signatures = body
            .block_signatures
            .into_iter()
            .map(|bs| bs.into_signature(creator))
            .collect();

        let mut event: Event = SignedEvent {
            body: EventBody {
                transactions: body.transactions,
                block_signatures,
                self_parent,
                other_parent,
                creator,
                index: body.index,
                timestamp: body.timestamp,
            },
            signature: wire.signature,
        }
        .into();

        event.set_wire_info(WireInfo {
            creator_id: body.creator_id,
            self_parent_index: body.self_parent_index,
            other_parent: body.other_parent,
        });
        Ok(event)
    }

    fn resolve_wire_parent(&self, creator: &PublicKey, parent: WireParent) -> Result<EventHash> {
        let parent_creator = self
            .participants
            .by_id(parent.creator_id)
            .ok_or_else(|| BraidError::UnknownParticipant(parent.creator_id.to_string()))?
            .pub_key;

        match self.store.participant_event(&parent_creator, parent.index) {
            Ok(hash) => Ok(hash),
            Err(e) if e.is_not_found() => {
                // Outside local history: look through the creator's root
                let root = self.store.get_root(creator)?;
                root.others
                    .values()
                    .find(|other| other.creator_id == parent.creator_id && other.index == parent.index)
                    .map(|other| other.hash)
                    .ok_or_else(|| {
                        BraidError::not_found(
                            "OtherParent",
                            format!("{}:{}", parent.creator_id, parent.index),
                        )
                    })
            }
            Err(e) => Err(e),
        }
    }

    // ========================================================================
    // Pipeline
    // ========================================================================

    /// One full consensus pass
    pub async fn run_consensus(&mut self) -> Result<()> {
        self.divide_rounds()?;
        self.decide_fame()?;
        self.decide_round_received()?;
        self.process_decided_rounds().await?;
        self.process_sig_pool()
    }
}
