//! Memo tables that hold arena handles weakly.
//!
//! Derivation, compaction and parse-forest construction are pure functions of
//! the nodes they are called on, and are called again and again on the same
//! shared sub-graphs. A [`WeakMemo`] remembers their results, keyed by the
//! call's arguments.
//!
//! Nodes live in an arena and are referred to by plain handles, so a memo
//! entry never owns a node. What it must not do is outlive one: once the
//! arena frees a node, every entry whose key or value mentions that node's
//! handle is dropped by [`WeakMemo::sweep`]. A long parse that supersedes one
//! derivative graph per token therefore leaves nothing behind in the memo.

use std::hash::Hash;
use std::sync::Arc;

use rustc_hash::FxHashMap;

/// Exposes the arena handles a key or value refers to.
pub trait Anchored<H> {
    /// Calls `visit` once for every handle this value mentions.
    fn anchors(&self, visit: &mut dyn FnMut(H));

    /// True if every handle this value mentions satisfies `is_live`.
    fn is_anchored_in(&self, is_live: &dyn Fn(H) -> bool) -> bool {
        let mut live = true;
        self.anchors(&mut |handle| live &= is_live(handle));
        live
    }
}

impl<H> Anchored<H> for bool {
    fn anchors(&self, _visit: &mut dyn FnMut(H)) {}
}

impl<H, V: Anchored<H>> Anchored<H> for Arc<V> {
    fn anchors(&self, visit: &mut dyn FnMut(H)) {
        (**self).anchors(visit)
    }
}

/// Hit/miss counters for one table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoStats {
    pub hits: u64,
    pub misses: u64,
    pub evicted: u64,
}

/// A call-result cache keyed by `K`, holding arena handles of type `H` weakly.
#[derive(Debug)]
pub struct WeakMemo<K, V> {
    entries: FxHashMap<K, V>,
    stats: MemoStats,
}

impl<K, V> Default for WeakMemo<K, V> {
    fn default() -> Self {
        Self { entries: FxHashMap::default(), stats: MemoStats::default() }
    }
}

impl<K: Eq + Hash, V: Clone> WeakMemo<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a cached result, counting the hit or miss.
    pub fn lookup(&mut self, key: &K) -> Option<V> {
        match self.entries.get(key) {
            Some(value) => {
                self.stats.hits += 1;
                Some(value.clone())
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Looks up a cached result without touching the statistics.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.entries.insert(key, value);
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> MemoStats {
        self.stats
    }

    /// Drops every entry whose key or value mentions a handle that is no
    /// longer live. Returns the number of entries dropped.
    pub fn sweep<H>(&mut self, is_live: impl Fn(H) -> bool) -> usize
    where
        K: Anchored<H>,
        V: Anchored<H>,
    {
        let is_live: &dyn Fn(H) -> bool = &is_live;
        let before = self.entries.len();
        self.entries
            .retain(|key, value| key.is_anchored_in(is_live) && value.is_anchored_in(is_live));
        let evicted = before - self.entries.len();
        self.stats.evicted += evicted as u64;
        if evicted > 0 {
            log::trace!("memo sweep evicted {} of {} entries", evicted, before);
        }
        evicted
    }
}

impl<K: Eq + Hash, V: Clone> Extend<(K, V)> for WeakMemo<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.entries.extend(iter)
    }
}
