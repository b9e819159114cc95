//! Engine-local memo tables
//!
//! DAG history never changes once inserted, so entries are never
//! invalidated individually; the whole set is rebuilt on reset.

use braid_core::EventHash;
use hashlink::LruCache;

pub(crate) type PairKey = (EventHash, EventHash);

pub(crate) struct EngineCaches {
    pub ancestor: LruCache<PairKey, bool>,
    pub self_ancestor: LruCache<PairKey, bool>,
    pub strongly_see: LruCache<PairKey, bool>,
    pub round: LruCache<EventHash, i64>,
    pub lamport: LruCache<EventHash, i64>,
}

impl EngineCaches {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            ancestor: LruCache::new(size),
            self_ancestor: LruCache::new(size),
            strongly_see: LruCache::new(size),
            round: LruCache::new(size),
            lamport: LruCache::new(size),
        }
    }
}
