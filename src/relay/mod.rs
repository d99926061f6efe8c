//! Relay peering state and block compression entry points
//!
//! A [`RelayNode`] is the per-peer handle for the compressed relay
//! protocol. It binds three pieces of state under one mutex: the send
//! cache (transactions we have relayed to the peer), the recv cache
//! (transactions the peer has relayed to us), and the set of block hashes
//! already processed in either direction. The two caches are independent;
//! protocol correctness only requires that our send cache stays in
//! lockstep with the peer's recv cache and vice versa.
//!
//! Every public operation acquires the node mutex for its full duration,
//! including the reader callback during decompression. Callers must not
//! depend on progress of other operations on the same node while a
//! receive is in flight.

pub mod compress;
pub mod decompress;
pub mod protocol;

use std::collections::HashSet;
use std::io::Read;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::cache::{TxCache, TxCacheLimits};
use crate::config::RelayConfig;
use self::compress::CompressError;
use self::decompress::{DecompressError, DecompressedBlock};
use self::protocol::tx_msg;

/// Leading-zero difficulty gate: the top seven bytes of the block hash
/// must be zero before either relay path will touch a block.
pub(crate) fn meets_difficulty(hash: &[u8; 32]) -> bool {
    hash[25..].iter().all(|&b| b == 0)
}

struct NodeInner {
    send_cache: TxCache,
    recv_cache: TxCache,
    blocks_already_seen: HashSet<[u8; 32]>,
}

/// Per-peer relay compression state
pub struct RelayNode {
    config: RelayConfig,
    inner: Mutex<NodeInner>,
}

impl Default for RelayNode {
    fn default() -> Self {
        Self::new(RelayConfig::default())
    }
}

impl RelayNode {
    pub fn new(config: RelayConfig) -> Self {
        let limits = TxCacheLimits {
            max_entries: config.cache_max_entries,
            max_bytes: config.cache_max_bytes,
        };
        Self {
            config,
            inner: Mutex::new(NodeInner {
                send_cache: TxCache::new(limits),
                recv_cache: TxCache::new(limits),
                blocks_already_seen: HashSet::new(),
            }),
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Admit a transaction to the send cache and build its relay message
    ///
    /// Returns `None` when the transaction should not be relayed: already
    /// cached, or rejected by the size policy of the active flag mode.
    pub fn get_relay_transaction(&self, tx: &Arc<Vec<u8>>) -> Option<Vec<u8>> {
        let mut inner = self.inner.lock().unwrap();

        if inner.send_cache.contains(tx) {
            return None;
        }

        if !self.config.use_old_flags {
            if tx.len() > self.config.max_relay_transaction_bytes {
                return None;
            }
            inner.send_cache.add(tx.clone(), false);
        } else {
            let oversize = tx.len() > self.config.old_max_relay_transaction_bytes;
            if oversize
                && (inner.send_cache.flag_count()
                    >= self.config.old_max_extra_oversize_transactions
                    || tx.len() > self.config.old_max_relay_oversize_transaction_bytes)
            {
                return None;
            }
            inner.send_cache.add(tx.clone(), oversize);
        }

        Some(tx_msg(tx))
    }

    /// Drop both caches; the seen-block set is kept
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.send_cache.clear();
        inner.recv_cache.clear();
    }

    fn check_recv_tx(&self, recv_flag_count: usize, tx_size: usize) -> bool {
        if !self.config.use_old_flags {
            tx_size <= self.config.max_relay_transaction_bytes
        } else {
            tx_size <= self.config.old_max_relay_transaction_bytes
                || (recv_flag_count < self.config.old_max_extra_oversize_transactions
                    && tx_size <= self.config.old_max_relay_oversize_transaction_bytes)
        }
    }

    /// Admission pre-check for a transaction of `tx_size` bytes from the peer
    ///
    /// Run before reading the body so an over-budget transaction can be
    /// skipped on the wire instead of admitted.
    pub fn maybe_recv_tx_of_size(&self, tx_size: usize) -> bool {
        let inner = self.inner.lock().unwrap();
        let admit = self.check_recv_tx(inner.recv_cache.flag_count(), tx_size);
        if !admit {
            debug!(
                "refusing freely relayed tx of size {} with {} oversize txn already cached",
                tx_size,
                inner.recv_cache.flag_count()
            );
        }
        admit
    }

    /// Admit a transaction relayed by the peer into the recv cache
    ///
    /// The caller must have pre-gated the size with
    /// [`maybe_recv_tx_of_size`](Self::maybe_recv_tx_of_size).
    pub fn recv_tx(&self, tx: Arc<Vec<u8>>) {
        let mut inner = self.inner.lock().unwrap();
        let tx_size = tx.len();
        assert!(
            self.check_recv_tx(inner.recv_cache.flag_count(), tx_size),
            "recv_tx admission must be pre-checked"
        );
        let oversize =
            self.config.use_old_flags && tx_size > self.config.old_max_relay_transaction_bytes;
        inner.recv_cache.add(tx, oversize);
    }

    /// Visit every transaction currently held in the send cache, in
    /// insertion order, under the node lock
    pub fn for_each_sent_tx(&self, visitor: impl FnMut(&Arc<Vec<u8>>)) {
        self.inner.lock().unwrap().send_cache.for_each(visitor);
    }

    /// Record a block hash as sent; true only on first insertion
    pub fn block_sent(&self, hash: [u8; 32]) -> bool {
        self.inner.lock().unwrap().blocks_already_seen.insert(hash)
    }

    /// Number of distinct blocks seen on either relay path
    pub fn blocks_sent(&self) -> usize {
        self.inner.lock().unwrap().blocks_already_seen.len()
    }

    /// Membership test against the send cache by transaction identity
    pub fn was_tx_sent(&self, tx_hash: &[u8; 32]) -> bool {
        self.inner.lock().unwrap().send_cache.contains_hash(tx_hash)
    }

    /// Compress a full block against the send cache
    ///
    /// `hash` is the canonical block hash and `block` the serialized block
    /// including its leading p2p message header. See
    /// [`CompressError`] for the failure kinds.
    pub fn maybe_compress_block(
        &self,
        hash: &[u8; 32],
        block: &[u8],
        check_merkle: bool,
    ) -> Result<Vec<u8>, CompressError> {
        let mut inner = self.inner.lock().unwrap();
        let NodeInner {
            send_cache,
            blocks_already_seen,
            ..
        } = &mut *inner;
        compress::compress_block(send_cache, blocks_already_seen, hash, block, check_merkle)
    }

    /// Rebuild a full block from its compressed relay form
    ///
    /// `reader` supplies the compressed body (everything after the relay
    /// message header); `tx_count` is the header's length field. The node
    /// mutex is held across all reads.
    pub fn decompress_relay_block(
        &self,
        reader: &mut dyn Read,
        tx_count: u32,
        check_merkle: bool,
    ) -> Result<DecompressedBlock, DecompressError> {
        let mut inner = self.inner.lock().unwrap();
        let NodeInner {
            recv_cache,
            blocks_already_seen,
            ..
        } = &mut *inner;
        decompress::decompress_block(recv_cache, blocks_already_seen, reader, tx_count, check_merkle)
    }
}
