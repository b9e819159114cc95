//! Engine counters

use serde::{Deserialize, Serialize};

/// Snapshot of the engine's progress
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusStats {
    /// Events still waiting for a round received
    pub undetermined_events: usize,

    /// Rounds queued for fame decision or commit
    pub pending_rounds: usize,

    /// Events committed since the last reset
    pub consensus_events: usize,

    /// Transactions committed
    pub consensus_transactions: u64,

    /// Inserted events with a payload that are not committed yet
    pub pending_loaded_events: i64,

    pub last_consensus_round: Option<i64>,
    pub first_consensus_round: Option<i64>,

    /// -1 before the first block
    pub last_block_index: i64,

    pub anchor_block: Option<i64>,

    /// Block signatures waiting for verification
    pub sig_pool: usize,

    /// Fame votes cast from the coin, counted on every pass
    pub coin_votes: u64,
}
