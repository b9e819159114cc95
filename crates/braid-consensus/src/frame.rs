//! Frame construction
//!
//! The frame of round `R` holds the events received in `R` sorted by
//! lamport timestamp then hash, and one root per participant describing its
//! history just before those events:
//!
//! - a participant whose events have already reached consensus gets a root
//!   built from its last consensus event;
//! - otherwise its current root is reused.
//!
//! Frame events whose other-parent is not an earlier frame event get that
//! parent recorded in their creator's root, so the frame can be inserted
//! into an empty engine.

use braid_core::{
    Block, BraidError, Event, EventHash, Frame, FrameEvent, PublicKey, Result, Root, RootEvent,
};
use hashbrown::HashSet;
use std::collections::BTreeMap;

use crate::hashgraph::Hashgraph;

impl Hashgraph {
    /// Frame of `round_received`, built once and then served from the store
    pub fn get_frame(&mut self, round_received: i64) -> Result<Frame> {
        match self.store.get_frame(round_received) {
            Ok(frame) => return Ok(frame),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        let round_info = self.store.get_round(round_received)?;
        let mut events = round_info
            .consensus_events()
            .iter()
            .map(|hash| self.store.get_event(hash))
            .collect::<Result<Vec<Event>>>()?;
        events.sort_by_key(|e| (e.lamport_timestamp(), e.hash()));

        let mut roots: BTreeMap<PublicKey, Root> = BTreeMap::new();
        let mut treated: HashSet<EventHash> = HashSet::new();
        for event in &events {
            let creator = *event.creator();
            if !roots.contains_key(&creator) {
                let root = self.root_before_frame(&creator)?;
                roots.insert(creator, root);
            }
            if let Some(other_parent) = event.other_parent() {
                if !treated.contains(other_parent) {
                    let other = self.other_parent_root_event(event, other_parent)?;
                    if let Some(root) = roots.get_mut(&creator) {
                        root.others.insert(event.hash(), other);
                    }
                }
            }
            treated.insert(event.hash());
        }

        let mut ordered_roots = Vec::with_capacity(self.participants.len());
        for pub_key in self.participants.pub_keys() {
            let root = match roots.remove(&pub_key) {
                Some(root) => root,
                None => self.root_before_frame(&pub_key)?,
            };
            ordered_roots.push(root);
        }

        let mut frame_events = Vec::with_capacity(events.len());
        for event in events {
            let hash = event.hash();
            frame_events.push(FrameEvent {
                round: self.round(&hash)?,
                lamport_timestamp: self.lamport_timestamp(&hash)?,
                witness: self.witness(&hash)?,
                core: event.without_annotations(),
            });
        }

        let frame = Frame::new(round_received, ordered_roots, frame_events);
        self.store.set_frame(frame.clone())?;
        Ok(frame)
    }

    fn root_before_frame(&mut self, participant: &PublicKey) -> Result<Root> {
        match self.store.last_consensus_event_from(participant)? {
            None => self.store.get_root(participant),
            Some(hash) => {
                let self_parent = self.root_event(&hash)?;
                Ok(Root {
                    next_round: self_parent.round,
                    self_parent,
                    others: BTreeMap::new(),
                })
            }
        }
    }

    fn other_parent_root_event(&mut self, event: &Event, other_parent: &EventHash) -> Result<RootEvent> {
        match self.store.get_event(other_parent) {
            Ok(_) => self.root_event(other_parent),
            Err(e) if e.is_not_found() => self
                .store
                .get_root(event.creator())?
                .other_for(&event.hash(), other_parent)
                .cloned()
                .ok_or(BraidError::UnknownParent(*other_parent)),
            Err(e) => Err(e),
        }
    }

    fn root_event(&mut self, hash: &EventHash) -> Result<RootEvent> {
        let event = self.store.get_event(hash)?;
        Ok(RootEvent {
            hash: *hash,
            creator_id: self.participants.id_of(event.creator())?,
            index: event.index(),
            lamport_timestamp: self.lamport_timestamp(hash)?,
            round: self.round(hash)?,
        })
    }

    /// Latest block with enough signatures, with its frame
    pub fn get_anchor_block_with_frame(&mut self) -> Result<(Block, Frame)> {
        let index = self.anchor_block.ok_or(BraidError::NoAnchorBlock)?;
        let block = self.store.get_block(index)?;
        let frame = self.get_frame(block.round_received())?;
        Ok((block, frame))
    }
}
