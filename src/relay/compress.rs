//! Full block to compressed relay block
//!
//! Walks the serialized block with a bounded cursor, replacing every
//! transaction the peer is known to hold with its 2-byte cache index and
//! embedding the rest inline behind a 3-byte length prefix. The transaction
//! bytes are never copied during the walk; cache lookup and merkle hashing
//! both reuse the same slice of the input block.

use std::collections::HashSet;

use thiserror::Error;

use crate::cache::TxCache;
use crate::hashes::double_sha256;
use crate::merkle::MerkleTreeBuilder;
use crate::relay::meets_difficulty;
use crate::relay::protocol::{
    RelayMsgHeader, BLOCK_MSG_HEADER_LEN, BLOCK_TYPE, INLINE_TX_SENTINEL, MAX_BLOCK_TRANSACTIONS,
    RELAY_MSG_HEADER_LEN,
};
use crate::varint::{ByteCursor, ReadError};

/// Lowest block version accepted on either relay path
pub(crate) const MIN_BLOCK_VERSION: i32 = 4;

/// Compression failure, one short protocol-log tag per kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CompressError {
    /// Block hash has nonzero bytes in the difficulty prefix
    #[error("BAD_WORK")]
    BadWork,
    /// Block was already compressed or marked sent on this node
    #[error("SEEN")]
    AlreadySeen,
    /// Block version predates the supported range
    #[error("SMALL_VERSION")]
    SmallVersion,
    /// Transaction count outside `[1, MAX_BLOCK_TRANSACTIONS]`
    #[error("TXCOUNT_RANGE")]
    TxCountRange,
    /// Structural parse failure anywhere in the block body
    #[error("INVALID_SIZE")]
    InvalidSize,
    /// Recomputed merkle root differs from the header field
    #[error("INVALID_MERKLE")]
    InvalidMerkle,
}

impl From<ReadError> for CompressError {
    fn from(_: ReadError) -> Self {
        CompressError::InvalidSize
    }
}

/// Compress `block` against the send cache
///
/// `hash` is the canonical block hash, already computed by the caller.
/// On success the block hash is recorded in `blocks_already_seen`; on any
/// error the seen-set is left untouched. Cache entries referenced by the
/// block are consumed as they are matched.
pub(crate) fn compress_block(
    send_cache: &mut TxCache,
    blocks_already_seen: &mut HashSet<[u8; 32]>,
    hash: &[u8; 32],
    block: &[u8],
    check_merkle: bool,
) -> Result<Vec<u8>, CompressError> {
    if check_merkle && !meets_difficulty(hash) {
        return Err(CompressError::BadWork);
    }
    if blocks_already_seen.contains(hash) {
        return Err(CompressError::AlreadySeen);
    }

    let mut cursor = ByteCursor::new(block);
    cursor.skip(BLOCK_MSG_HEADER_LEN)?;
    let header_start = cursor.position();

    let block_version = cursor.read_u32_le()? as i32;
    if block_version < MIN_BLOCK_VERSION {
        return Err(CompressError::SmallVersion);
    }

    cursor.skip(32)?; // prev-block hash
    let merkle_root_start = cursor.position();
    cursor.skip(80 - (4 + 32))?;

    let tx_count = cursor.read_varint()?;
    if tx_count < 1 || tx_count > MAX_BLOCK_TRANSACTIONS {
        return Err(CompressError::TxCountRange);
    }
    let tx_count = tx_count as usize;

    let mut compressed = Vec::with_capacity(RELAY_MSG_HEADER_LEN + block.len());
    compressed.extend_from_slice(&RelayMsgHeader::new(BLOCK_TYPE, tx_count as u32).encode());
    compressed.extend_from_slice(&block[header_start..header_start + 80]);

    let mut merkle = check_merkle.then(|| MerkleTreeBuilder::new(tx_count));
    let mut batch = send_cache.batch();

    for i in 0..tx_count {
        let tx_start = cursor.position();

        cursor.skip(4)?; // tx version

        let txin_count = cursor.read_varint()?;
        for _ in 0..txin_count {
            cursor.skip(36)?; // outpoint
            let script_len = cursor.read_varint()?;
            cursor.skip_var(script_len)?;
            cursor.skip(4)?; // sequence
        }

        let txout_count = cursor.read_varint()?;
        for _ in 0..txout_count {
            cursor.skip(8)?; // value
            let script_len = cursor.read_varint()?;
            cursor.skip_var(script_len)?;
        }

        cursor.skip(4)?; // locktime

        let tx_bytes = &block[tx_start..cursor.position()];
        let index = batch.remove_matching(tx_bytes);

        if let Some(merkle) = merkle.as_mut() {
            *merkle.slot_mut(i) = double_sha256(tx_bytes);
        }

        match index {
            Some(index) => {
                compressed.extend_from_slice(&(index as u16).to_be_bytes());
            }
            None => {
                let tx_len = tx_bytes.len();
                if tx_len > 0xff_ffff {
                    // does not fit the 3-byte inline length prefix
                    return Err(CompressError::InvalidSize);
                }
                compressed.extend_from_slice(&INLINE_TX_SENTINEL.to_be_bytes());
                compressed.push((tx_len >> 16) as u8);
                compressed.push((tx_len >> 8) as u8);
                compressed.push(tx_len as u8);
                compressed.extend_from_slice(tx_bytes);
            }
        }
    }
    drop(batch);

    if let Some(merkle) = merkle.as_mut() {
        let mut root = [0u8; 32];
        root.copy_from_slice(&block[merkle_root_start..merkle_root_start + 32]);
        if !merkle.root_matches(&root) {
            return Err(CompressError::InvalidMerkle);
        }
    }

    let inserted = blocks_already_seen.insert(*hash);
    debug_assert!(inserted, "seen-set changed during compression");

    Ok(compressed)
}
