//! Reset and bootstrap
//!
//! `reset` restarts the engine from a trusted block and its frame instead of
//! replaying history; `bootstrap` rebuilds state by replaying a topologically
//! ordered event sequence. Both leave the engine in an undefined state on
//! error: the caller discards it and builds a new one.

use braid_core::{Block, BraidError, Event, Frame, FrameEvent, PublicKey, Result, Root, RoundInfo};
use std::collections::BTreeMap;
use tracing::info;

use crate::cache::EngineCaches;
use crate::hashgraph::Hashgraph;

impl Hashgraph {
    /// Install `frame` as the new baseline and `block` as the latest block
    pub fn reset(&mut self, block: Block, frame: Frame) -> Result<()> {
        if block.round_received() != frame.round || *block.frame_hash() != frame.hash() {
            return Err(BraidError::InvalidInput(format!(
                "block {} does not match the frame of round {}",
                block.index(),
                frame.round
            )));
        }
        if frame.roots.len() != self.participants.len() {
            return Err(BraidError::InvalidInput(format!(
                "frame has {} roots for {} participants",
                frame.roots.len(),
                self.participants.len()
            )));
        }

        self.undetermined_events.clear();
        self.pending_rounds.clear();
        self.sig_pool.clear();
        self.topological_index = 0;
        self.pending_loaded_events = 0;
        self.caches = EngineCaches::new(self.cache_size());

        let roots: BTreeMap<PublicKey, Root> = self
            .participants
            .pub_keys()
            .into_iter()
            .zip(frame.roots.iter().cloned())
            .collect();
        self.store.reset(roots)?;
        self.roots_by_self_parent = self.store.roots_by_self_parent()?.into_iter().collect();

        self.anchor_block = if block.signature_count() > self.participants.trust_count() {
            Some(block.index())
        } else {
            None
        };
        let block_index = block.index();
        self.store.set_block(block)?;

        self.last_consensus_round = Some(frame.round);
        self.first_consensus_round.get_or_insert(frame.round);

        for frame_event in &frame.events {
            self.insert_frame_event(frame_event.clone(), frame.round)?;
        }
        let events = frame.events.len();
        let round = frame.round;
        self.store.set_frame(frame)?;

        info!(round, block = block_index, events, "Reset to frame");
        Ok(())
    }

    /// Reinsert a frame event with the consensus values it carries
    fn insert_frame_event(&mut self, frame_event: FrameEvent, round_received: i64) -> Result<()> {
        let FrameEvent {
            core,
            round,
            lamport_timestamp,
            witness,
        } = frame_event;

        let mut event = self.link_event(core, false)?;
        let hash = event.hash();
        event.set_round(round);
        event.set_lamport_timestamp(lamport_timestamp);
        event.set_round_received(round_received);
        self.store.set_event(event.clone())?;
        self.store.add_consensus_event(&event)?;

        let mut round_info = match self.store.get_round(round) {
            Ok(info) => info,
            Err(e) if e.is_not_found() => RoundInfo::new(),
            Err(e) => return Err(e),
        };
        if witness {
            round_info.add_decided_witness(hash, false);
        } else {
            round_info.add_event(hash, false);
        }
        self.store.set_round(round, round_info)
    }

    /// Replay `events` in order, then run one full consensus pass
    pub async fn bootstrap<I>(&mut self, events: I) -> Result<()>
    where
        I: IntoIterator<Item = Event>,
    {
        let mut inserted = 0usize;
        for event in events {
            self.insert_event(event.without_annotations(), true)?;
            inserted += 1;
        }
        self.run_consensus().await?;

        info!(
            events = inserted,
            last_consensus_round = ?self.last_consensus_round,
            "Bootstrap complete"
        );
        Ok(())
    }
}
