//! Compressed relay block back to a full block
//!
//! Reads the compressed body from a caller-supplied reader, pulling inline
//! transactions off the wire and the rest out of the recv cache. Cache
//! references arrive ordered by block position but were emitted against the
//! sender's cache state at the moment each transaction was matched, so the
//! indices are rewritten with `tweak_sort` before any entry is consumed.

use std::collections::HashSet;
use std::io::Read;
use std::sync::Arc;

use thiserror::Error;

use crate::cache::TxCache;
use crate::hashes::{block_hash, double_sha256};
use crate::merkle::MerkleTreeBuilder;
use crate::relay::compress::MIN_BLOCK_VERSION;
use crate::relay::meets_difficulty;
use crate::relay::protocol::{
    BLOCK_MSG_HEADER_LEN, INLINE_TX_SENTINEL, MAX_BLOCK_TRANSACTIONS, RELAY_MSG_HEADER_LEN,
};
use crate::varint::write_varint;

/// Largest transaction accepted inline in a compressed block
pub const MAX_INLINE_TX_BYTES: usize = 1_000_000;

/// Decompression failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecompressError {
    #[error("got a BLOCK message with far too many transactions")]
    TooManyTransactions,
    #[error("failed to read block header")]
    BlockHeaderRead,
    #[error("block had version < 4")]
    SmallVersion,
    #[error("block hash did not meet minimum difficulty target")]
    BadWork,
    #[error("failed to read tx index")]
    TxIndexRead,
    #[error("failed to read tx length")]
    TxLengthRead,
    #[error("got unreasonably large tx")]
    OversizeTx,
    #[error("failed to read transaction data")]
    TxDataRead,
    #[error("failed to find referenced transaction")]
    MissingTx,
    #[error("merkle tree root did not match")]
    MerkleMismatch,
}

/// Result of a successful decompression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecompressedBlock {
    /// Compressed bytes consumed, counted from the relay message header
    pub wire_bytes: u32,
    /// Reconstructed block; the leading p2p message header area is zeroed
    /// for the caller's framing layer to fill in
    pub block: Vec<u8>,
    /// Double SHA256 of the 80-byte block header
    pub block_hash: [u8; 32],
}

/// A cache reference in a compressed block: wire index plus block position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct IndexPtr {
    pub index: u16,
    pub pos: usize,
}

/// Sort cache references by wire index while rewriting each index to the
/// value it will hold when the receiver consumes it
///
/// The sender evicted cache entries as it walked the block, so every index
/// was emitted relative to a cache that earlier references had already
/// shrunk. A stable merge sort recovers a usable order: after merging, each
/// element taken from the left half has its index reduced by the number of
/// right-half elements emitted ahead of it. The output is simultaneously
/// sorted by original index and carries the adjusted one.
pub(crate) fn tweak_sort(ptrs: &mut [IndexPtr], start: usize, end: usize) {
    if start + 1 >= end {
        return;
    }
    let split = start + (end - start) / 2;
    tweak_sort(ptrs, start, split);
    tweak_sort(ptrs, split, end);

    let left: Vec<IndexPtr> = ptrs[start..split].to_vec();
    let mut j = 0;
    let mut k = split;
    for i in start..end {
        let consumed = k - split;
        if j < left.len()
            && (k >= end || left[j].index as usize - consumed <= ptrs[k].index as usize)
        {
            ptrs[i] = IndexPtr {
                index: left[j].index - consumed as u16,
                pos: left[j].pos,
            };
            j += 1;
        } else {
            ptrs[i] = ptrs[k];
            k += 1;
        }
    }
}

/// Rebuild a full block from its compressed relay form
///
/// `tx_count` comes from the relay message header's length field. Reads run
/// to completion before any cache entry is removed, and every reference is
/// checked against the cache size first, so a failed decompression leaves
/// the cache exactly as it was.
pub(crate) fn decompress_block(
    recv_cache: &mut TxCache,
    blocks_already_seen: &mut HashSet<[u8; 32]>,
    reader: &mut dyn Read,
    tx_count: u32,
    check_merkle: bool,
) -> Result<DecompressedBlock, DecompressError> {
    if tx_count as u64 > MAX_BLOCK_TRANSACTIONS {
        return Err(DecompressError::TooManyTransactions);
    }
    let tx_count = tx_count as usize;

    let mut block = Vec::with_capacity(BLOCK_MSG_HEADER_LEN + MAX_INLINE_TX_BYTES);
    block.resize(BLOCK_MSG_HEADER_LEN + 80, 0);
    reader
        .read_exact(&mut block[BLOCK_MSG_HEADER_LEN..BLOCK_MSG_HEADER_LEN + 80])
        .map_err(|_| DecompressError::BlockHeaderRead)?;
    let mut wire_bytes = RELAY_MSG_HEADER_LEN as u32;

    let mut version_raw = [0u8; 4];
    version_raw.copy_from_slice(&block[BLOCK_MSG_HEADER_LEN..BLOCK_MSG_HEADER_LEN + 4]);
    if i32::from_le_bytes(version_raw) < MIN_BLOCK_VERSION {
        return Err(DecompressError::SmallVersion);
    }

    let block_hash = block_hash(&block, BLOCK_MSG_HEADER_LEN);
    blocks_already_seen.insert(block_hash);

    if check_merkle && !meets_difficulty(&block_hash) {
        return Err(DecompressError::BadWork);
    }

    block.extend_from_slice(&write_varint(tx_count as u64));

    let mut merkle = check_merkle.then(|| MerkleTreeBuilder::new(tx_count));
    let mut txn_data: Vec<Option<Arc<Vec<u8>>>> = vec![None; tx_count];
    let mut txn_ptrs: Vec<IndexPtr> = Vec::with_capacity(tx_count);

    for i in 0..tx_count {
        let mut index_raw = [0u8; 2];
        reader
            .read_exact(&mut index_raw)
            .map_err(|_| DecompressError::TxIndexRead)?;
        let index = u16::from_be_bytes(index_raw);
        wire_bytes += 2;

        if index == INLINE_TX_SENTINEL {
            let mut len_raw = [0u8; 3];
            reader
                .read_exact(&mut len_raw)
                .map_err(|_| DecompressError::TxLengthRead)?;
            let tx_size = u32::from_be_bytes([0, len_raw[0], len_raw[1], len_raw[2]]) as usize;
            if tx_size > MAX_INLINE_TX_BYTES {
                return Err(DecompressError::OversizeTx);
            }

            let mut data = vec![0u8; tx_size];
            reader
                .read_exact(&mut data)
                .map_err(|_| DecompressError::TxDataRead)?;
            wire_bytes += 3 + tx_size as u32;

            if let Some(merkle) = merkle.as_mut() {
                *merkle.slot_mut(i) = double_sha256(&data);
            }
            txn_data[i] = Some(Arc::new(data));
        } else {
            txn_ptrs.push(IndexPtr { index, pos: i });
        }
    }

    let ptr_count = txn_ptrs.len();
    tweak_sort(&mut txn_ptrs, 0, ptr_count);

    // All-or-nothing: the k-th reference pulls from a cache already shrunk
    // by k removals, so validate every adjusted index before touching it.
    for (removed, ptr) in txn_ptrs.iter().enumerate() {
        if ptr.index as usize + removed >= recv_cache.len() {
            return Err(DecompressError::MissingTx);
        }
    }

    let mut batch = recv_cache.batch();
    for ptr in &txn_ptrs {
        let (tx, tx_hash) = batch
            .remove_by_index(ptr.index as usize)
            .ok_or(DecompressError::MissingTx)?;
        if let Some(merkle) = merkle.as_mut() {
            *merkle.slot_mut(ptr.pos) = tx_hash;
        }
        txn_data[ptr.pos] = Some(tx);
    }
    drop(batch);

    debug_assert!(txn_data.iter().all(|slot| slot.is_some()));
    for tx in txn_data.iter().flatten() {
        block.extend_from_slice(tx);
    }

    if let Some(merkle) = merkle.as_mut() {
        let root_start = BLOCK_MSG_HEADER_LEN + 4 + 32;
        let mut root = [0u8; 32];
        root.copy_from_slice(&block[root_start..root_start + 32]);
        if !merkle.root_matches(&root) {
            return Err(DecompressError::MerkleMismatch);
        }
    }

    Ok(DecompressedBlock {
        wire_bytes,
        block,
        block_hash,
    })
}
