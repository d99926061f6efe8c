//! Ordered transaction cache shared by the two relay directions
//!
//! Each relay peering keeps two of these: one holding transactions we have
//! relayed to the peer (send side) and one holding transactions the peer has
//! relayed to us (recv side). Both sides keep the same transactions in the
//! same insertion order, so the position of an entry is a shared name the
//! compressed block format can use instead of the transaction bytes.
//!
//! Positions are only stable until the next removal: removing the entry at
//! index `k` shifts every later entry down by one. The block codec accounts
//! for exactly that shift.

use std::collections::{HashSet, VecDeque};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use tracing::debug;

use crate::hashes::double_sha256;

/// Hard ceiling on cache entries: a cached transaction is referenced on the
/// wire by a u16 index and 0xffff is the inline-transaction sentinel.
pub const MAX_CACHED_TRANSACTIONS: usize = 0xffff;

struct CacheEntry {
    tx: Arc<Vec<u8>>,
    hash: [u8; 32],
    oversize: bool,
}

/// Capacity bounds for a [`TxCache`]
#[derive(Debug, Clone, Copy)]
pub struct TxCacheLimits {
    /// Maximum number of cached transactions (clamped to `MAX_CACHED_TRANSACTIONS`)
    pub max_entries: usize,
    /// Maximum total size of cached transaction bytes
    pub max_bytes: usize,
}

/// Ordered, content-addressed store of pending relay transactions
///
/// Supports membership by transaction identity (double SHA256), append at
/// the tail, removal by position or by content with index compaction, and
/// first-in-first-out eviction once either capacity bound is exceeded.
pub struct TxCache {
    entries: VecDeque<CacheEntry>,
    /// Identity index; an entry is present here iff it is in `entries`.
    members: HashSet<[u8; 32]>,
    flag_count: usize,
    total_bytes: usize,
    limits: TxCacheLimits,
    in_batch: bool,
}

impl TxCache {
    pub fn new(limits: TxCacheLimits) -> Self {
        let limits = TxCacheLimits {
            max_entries: limits.max_entries.min(MAX_CACHED_TRANSACTIONS),
            max_bytes: limits.max_bytes,
        };
        Self {
            entries: VecDeque::new(),
            members: HashSet::new(),
            flag_count: 0,
            total_bytes: 0,
            limits,
            in_batch: false,
        }
    }

    /// Number of cached transactions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of currently-held oversize entries
    pub fn flag_count(&self) -> usize {
        self.flag_count
    }

    /// Total size of all cached transaction bytes
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Membership by transaction identity
    pub fn contains_hash(&self, hash: &[u8; 32]) -> bool {
        self.members.contains(hash)
    }

    /// Membership by transaction content
    pub fn contains(&self, tx: &[u8]) -> bool {
        self.contains_hash(&double_sha256(tx))
    }

    /// Append a transaction at the tail
    ///
    /// A transaction already present is not admitted twice; both ends of a
    /// peering only ever admit fresh transactions, so a duplicate means the
    /// peer is misbehaving and the add is dropped.
    pub fn add(&mut self, tx: Arc<Vec<u8>>, oversize: bool) {
        let hash = double_sha256(&tx);
        if !self.members.insert(hash) {
            debug!("dropping duplicate cache add of tx {}", hex::encode(hash));
            return;
        }

        self.total_bytes += tx.len();
        if oversize {
            self.flag_count += 1;
        }
        self.entries.push_back(CacheEntry { tx, hash, oversize });

        if !self.in_batch {
            self.enforce_limits();
        }
    }

    /// Remove the entry whose content equals `tx`, returning its former index
    ///
    /// Later entries shift down by one. Returns `None` when no entry matches.
    pub fn remove_matching(&mut self, tx: &[u8]) -> Option<usize> {
        let hash = double_sha256(tx);
        if !self.members.contains(&hash) {
            return None;
        }
        let index = self.entries.iter().position(|e| e.hash == hash)?;
        self.remove_entry(index);
        Some(index)
    }

    /// Remove the entry at `index`, returning the blob and its identity hash
    ///
    /// Later entries shift down by one. Returns `None` when `index` is out
    /// of range.
    pub fn remove_by_index(&mut self, index: usize) -> Option<(Arc<Vec<u8>>, [u8; 32])> {
        if index >= self.entries.len() {
            return None;
        }
        let entry = self.remove_entry(index);
        Some((entry.tx, entry.hash))
    }

    /// Visit all cached transactions in insertion order
    pub fn for_each(&self, mut visitor: impl FnMut(&Arc<Vec<u8>>)) {
        for entry in &self.entries {
            visitor(&entry.tx);
        }
    }

    /// Drop every entry; capacity bounds are unchanged
    pub fn clear(&mut self) {
        self.entries.clear();
        self.members.clear();
        self.flag_count = 0;
        self.total_bytes = 0;
    }

    /// Open a batch scope for a block-scale traversal
    ///
    /// While the guard is alive, per-operation capacity enforcement is
    /// suspended; dropping the guard re-enables it and applies any deferred
    /// eviction. Release happens on every exit path, success or error.
    pub fn batch(&mut self) -> CacheBatch<'_> {
        self.in_batch = true;
        CacheBatch { cache: self }
    }

    fn remove_entry(&mut self, index: usize) -> CacheEntry {
        // index is validated by both callers
        let entry = self.entries.remove(index).expect("cache index in range");
        self.members.remove(&entry.hash);
        self.total_bytes -= entry.tx.len();
        if entry.oversize {
            self.flag_count -= 1;
        }
        entry
    }

    fn enforce_limits(&mut self) {
        while self.entries.len() > self.limits.max_entries
            || self.total_bytes > self.limits.max_bytes
        {
            let evicted = self.remove_entry(0);
            debug!(
                "evicted eldest cached tx {} ({} bytes)",
                hex::encode(evicted.hash),
                evicted.tx.len()
            );
        }
    }
}

/// RAII scope for batch operations on a [`TxCache`]
///
/// Created by [`TxCache::batch`]; dereferences to the cache itself.
pub struct CacheBatch<'a> {
    cache: &'a mut TxCache,
}

impl Deref for CacheBatch<'_> {
    type Target = TxCache;

    fn deref(&self) -> &TxCache {
        self.cache
    }
}

impl DerefMut for CacheBatch<'_> {
    fn deref_mut(&mut self) -> &mut TxCache {
        self.cache
    }
}

impl Drop for CacheBatch<'_> {
    fn drop(&mut self) {
        self.cache.in_batch = false;
        self.cache.enforce_limits();
    }
}
