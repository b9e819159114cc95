//! Store capability
//!
//! The engine is written against this trait only. Implementations may keep
//! everything in memory, persist to disk or front a remote service; the
//! engine awaits nothing beyond the return of each call.
//!
//! ## Conventions
//!
//! - Misses are reported as errors: `UnknownEvent` for events, `NotFound`
//!   for rounds, blocks, frames and roots.
//! - Participants are addressed by public key.
//! - A participant with no stored events is represented by its root:
//!   [`Store::last_event_from`] returns the root's self-parent marker.

use std::collections::{BTreeMap, HashMap};

use crate::block::Block;
use crate::error::Result;
use crate::event::Event;
use crate::frame::Frame;
use crate::root::Root;
use crate::round_info::RoundInfo;
use crate::types::{EventHash, PublicKey};

/// Last event of a participant
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LastEvent {
    pub hash: EventHash,

    /// True when `hash` is the self-parent marker of the participant's root
    pub is_root: bool,
}

/// Storage collaborator of the consensus engine
pub trait Store: Send + Sync {
    /// Sizing hint for engine-local caches
    fn cache_size(&self) -> usize;

    // === Events ===

    fn get_event(&self, hash: &EventHash) -> Result<Event>;

    /// Insert a new event or overwrite the annotations of a known one
    fn set_event(&self, event: Event) -> Result<()>;

    /// Hash of `participant`'s event at `index`, including its root's
    /// self-parent marker
    fn participant_event(&self, participant: &PublicKey, index: i64) -> Result<EventHash>;

    fn last_event_from(&self, participant: &PublicKey) -> Result<LastEvent>;

    /// Last event of `participant` that reached consensus since the last
    /// reset, if any
    fn last_consensus_event_from(&self, participant: &PublicKey) -> Result<Option<EventHash>>;

    /// Append `event` to the consensus log; an event already logged is
    /// left where it is
    fn add_consensus_event(&self, event: &Event) -> Result<()>;

    /// Consensus events in commit order
    fn consensus_events(&self) -> Vec<EventHash>;

    fn consensus_events_count(&self) -> usize;

    // === Rounds ===

    fn get_round(&self, round: i64) -> Result<RoundInfo>;

    fn set_round(&self, round: i64, info: RoundInfo) -> Result<()>;

    /// Highest round with a stored `RoundInfo`, -1 if none
    fn last_round(&self) -> i64;

    /// Witnesses of `round` in hash order; empty for an unknown round
    fn round_witnesses(&self, round: i64) -> Vec<EventHash>;

    // === Roots ===

    fn get_root(&self, participant: &PublicKey) -> Result<Root>;

    /// Roots keyed by the hash of their self-parent marker
    fn roots_by_self_parent(&self) -> Result<HashMap<EventHash, Root>>;

    // === Blocks and frames ===

    fn get_block(&self, index: i64) -> Result<Block>;

    fn set_block(&self, block: Block) -> Result<()>;

    /// Index of the latest block, -1 if none
    fn last_block_index(&self) -> i64;

    fn get_frame(&self, round: i64) -> Result<Frame>;

    fn set_frame(&self, frame: Frame) -> Result<()>;

    // === Lifecycle ===

    /// Drop all events, rounds, frames and consensus history and install
    /// `roots` as the new baseline. Blocks are kept.
    fn reset(&self, roots: BTreeMap<PublicKey, Root>) -> Result<()>;
}
