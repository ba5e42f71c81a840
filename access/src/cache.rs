//! Bounded LRU verdict cache.
//!
//! Owned exclusively by the orchestrator, so no internal locking is
//! needed — this is a plain `IndexMap`-backed LRU: promote on hit, evict
//! the eldest entry once capacity is exceeded.

use crate::token::LocationToken;
use indexmap::IndexMap;

const DEFAULT_CAPACITY: usize = 50;

pub struct VerdictCache {
    capacity: usize,
    entries: IndexMap<LocationToken, bool>,
}

impl Default for VerdictCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl VerdictCache {
    pub fn new(capacity: usize) -> Self {
        VerdictCache {
            capacity,
            entries: IndexMap::with_capacity(capacity),
        }
    }

    /// Looks up `token`, promoting it to most-recently-used on a hit.
    pub fn get(&mut self, token: LocationToken) -> Option<bool> {
        let value = self.entries.shift_remove(&token)?;
        self.entries.insert(token, value);
        Some(value)
    }

    /// Inserts or updates `token`, evicting the eldest entry if this push
    /// exceeds capacity. O(1) amortized.
    pub fn insert(&mut self, token: LocationToken, allowed: bool) {
        self.entries.shift_remove(&token);
        self.entries.insert(token, allowed);
        if self.entries.len() > self.capacity {
            self.entries.shift_remove_index(0);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every cached verdict at once, used whenever the active
    /// config snapshot changes underneath it.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
