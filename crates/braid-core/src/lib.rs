//! # Braid Core
//!
//! Data model for the Braid hashgraph consensus engine.
//!
//! This crate provides the building blocks the engine computes over:
//! - `Event` - a signed DAG node with its consensus annotations
//! - `Root` - a per-participant checkpoint standing in for pruned history
//! - `RoundInfo` - witnesses and fame of one round
//! - `Frame` / `Block` - the snapshot and the committed output of a round
//! - `Store` - the storage capability the engine is written against
//!
//! ## Architecture
//!
//! Every participant extends its own chain of events; each event also points
//! at one event of another participant, weaving the chains into a DAG.
//!
//! ```text
//!     P0          P1          P2
//!     │           │           │
//!     x2 ◄─────── y2          │        each event: self-parent (│)
//!     │           │ ╲         │                    other-parent (─)
//!     x1 ◄──┐     y1 ╲──────► z1
//!     │     └──── │           │
//!     x0          y0          z0
//!     │           │           │
//!   root        root        root
//! ```

pub mod block;
pub mod error;
pub mod event;
pub mod frame;
pub mod participants;
pub mod root;
pub mod round_info;
pub mod store;
pub mod types;

pub use block::*;
pub use error::*;
pub use event::*;
pub use frame::*;
pub use participants::*;
pub use root::*;
pub use round_info::*;
pub use store::*;
pub use types::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::block::{Block, BlockSignature};
    pub use crate::error::{BraidError, Result};
    pub use crate::event::{Event, WireEvent};
    pub use crate::frame::{Frame, FrameEvent};
    pub use crate::participants::{Participants, Peer};
    pub use crate::root::{Root, RootEvent};
    pub use crate::round_info::{PendingRound, RoundInfo, Trilean};
    pub use crate::store::{LastEvent, Store};
    pub use crate::types::*;
}
