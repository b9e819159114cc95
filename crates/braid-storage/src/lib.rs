//! # Braid Storage
//!
//! Implementations of the [`braid_core::Store`] capability.
//!
//! ## Components
//!
//! - `inmem` - `InMemStore`, the reference store: lock-guarded maps holding
//!   events, rounds, roots, blocks and frames
//! - `event_log` - `EventLog`, an append-only file of signed events in
//!   insertion order, replayed on cold start

pub mod event_log;
pub mod inmem;

pub use event_log::EventLog;
pub use inmem::InMemStore;
