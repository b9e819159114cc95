//! # Braid Consensus
//!
//! Hashgraph consensus: a leaderless total order over a gossip DAG, derived
//! from the graph structure alone through virtual voting.
//!
//! ## Pipeline
//!
//! | Step | Module | Output |
//! |------|--------|--------|
//! | `insert_event` | `hashgraph` | stored event with coordinate tables |
//! | `divide_rounds` | `rounds` | round, witness flag, lamport timestamp |
//! | `decide_fame` | `fame` | famous / not famous witnesses |
//! | `decide_round_received` | `ordering` | round received |
//! | `process_decided_rounds` | `ordering`, `frame` | frames and blocks on the commit channel |
//! | `process_sig_pool` | `sig_pool` | block signatures, anchor block |
//!
//! ## Thresholds
//!
//! With `n` participants a supermajority is `2n/3 + 1` and a block needs
//! more than `ceil(n/3)` signatures to become the anchor block.

mod ancestry;
mod cache;
pub mod config;
mod fame;
mod frame;
pub mod hashgraph;
mod ordering;
mod reset;
mod rounds;
mod sig_pool;
pub mod stats;

pub use config::{commit_channel, ConsensusConfig, ReceivedCriterion};
pub use hashgraph::Hashgraph;
pub use stats::ConsensusStats;

/// Consensus prelude
pub mod prelude {
    pub use crate::config::{commit_channel, ConsensusConfig, ReceivedCriterion};
    pub use crate::hashgraph::Hashgraph;
    pub use crate::stats::ConsensusStats;
    pub use braid_core::prelude::*;
}
