//! Ancestry predicates
//!
//! All four predicates read the coordinate tables built at insertion:
//!
//! ```text
//!   ancestor(x, y)       x.last_ancestors[creator(y)].index >= y.index
//!   strongly_see(x, y)   |{p : x.last_ancestors[p] >= y.first_descendants[p]}| >= 2n/3 + 1
//! ```
//!
//! Forks are rejected at insertion, so `see` is plain ancestry.

use braid_core::{BraidError, EventHash, Result};

use crate::hashgraph::Hashgraph;

impl Hashgraph {
    /// True iff `y` is `x` or reachable from `x` through parent edges
    pub fn ancestor(&mut self, x: &EventHash, y: &EventHash) -> Result<bool> {
        if x == y {
            return Ok(true);
        }
        let key = (*x, *y);
        if let Some(cached) = self.caches.ancestor.get(&key) {
            return Ok(*cached);
        }

        let ex = self.store.get_event(x)?;
        let ey = self.store.get_event(y)?;
        let creator_id = self.participants.id_of(ey.creator())?;
        let entry = ex
            .last_ancestors()
            .get_by_id(creator_id)
            .ok_or_else(|| BraidError::UnknownParticipant(ey.creator().to_hex()))?;
        let result = entry.index >= ey.index();

        self.caches.ancestor.insert(key, result);
        Ok(result)
    }

    /// True iff `y` is `x` or an earlier event by the same creator
    pub fn self_ancestor(&mut self, x: &EventHash, y: &EventHash) -> Result<bool> {
        if x == y {
            return Ok(true);
        }
        let key = (*x, *y);
        if let Some(cached) = self.caches.self_ancestor.get(&key) {
            return Ok(*cached);
        }

        let ex = self.store.get_event(x)?;
        let ey = self.store.get_event(y)?;
        let result = ex.creator() == ey.creator() && ex.index() >= ey.index();

        self.caches.self_ancestor.insert(key, result);
        Ok(result)
    }

    pub fn see(&mut self, x: &EventHash, y: &EventHash) -> Result<bool> {
        self.ancestor(x, y)
    }

    /// True iff `x` reaches `y` through paths crossing a supermajority of
    /// participants
    pub fn strongly_see(&mut self, x: &EventHash, y: &EventHash) -> Result<bool> {
        let key = (*x, *y);
        if let Some(cached) = self.caches.strongly_see.get(&key) {
            return Ok(*cached);
        }

        let ex = self.store.get_event(x)?;
        let ey = self.store.get_event(y)?;
        let mut count = 0;
        for id in self.participants.ids() {
            let last = ex.last_ancestors().get_by_id(id);
            let first = ey.first_descendants().get_by_id(id);
            if let (Some(last), Some(first)) = (last, first) {
                if last.index >= first.index {
                    count += 1;
                }
            }
        }
        let result = count >= self.participants.super_majority();

        self.caches.strongly_see.insert(key, result);
        Ok(result)
    }
}
