//! Shared fixtures for relay integration tests

use relay_node::hashes::{double_sha256, double_sha256_two_32};
use relay_node::varint::write_varint;
use relay_node::BLOCK_MSG_HEADER_LEN;

/// Build a structurally valid transaction of exactly `size` bytes
///
/// One input, one output; `seed` lands in the outpoint and scripts so
/// different seeds produce different transactions. The fixed fields cost
/// 60 bytes, the rest is split across the two scripts.
pub fn build_tx(seed: u8, size: usize) -> Vec<u8> {
    let script_total = size.checked_sub(60).expect("tx size below fixed overhead");
    let script_sig = script_total.min(0xfc);
    let script_pubkey = script_total - script_sig;
    assert!(script_pubkey <= 0xfc, "tx size too large for the test builder");

    let mut tx = Vec::with_capacity(size);
    tx.extend_from_slice(&4u32.to_le_bytes()); // version
    tx.extend_from_slice(&write_varint(1)); // input count
    tx.extend_from_slice(&[seed; 32]); // prev txid
    tx.extend_from_slice(&u32::from(seed).to_le_bytes()); // prev vout
    tx.extend_from_slice(&write_varint(script_sig as u64));
    tx.extend(std::iter::repeat(seed).take(script_sig));
    tx.extend_from_slice(&0xffff_ffffu32.to_le_bytes()); // sequence
    tx.extend_from_slice(&write_varint(1)); // output count
    tx.extend_from_slice(&50_000u64.to_le_bytes()); // value
    tx.extend_from_slice(&write_varint(script_pubkey as u64));
    tx.extend(std::iter::repeat(seed.wrapping_add(1)).take(script_pubkey));
    tx.extend_from_slice(&0u32.to_le_bytes()); // locktime

    assert_eq!(tx.len(), size);
    tx
}

/// Pairwise double SHA256 fold, duplicating the last hash of odd rows
pub fn merkle_root(txs: &[Vec<u8>]) -> [u8; 32] {
    let mut row: Vec<[u8; 32]> = txs.iter().map(|tx| double_sha256(tx)).collect();
    if row.is_empty() {
        return [0u8; 32];
    }
    while row.len() > 1 {
        let mut next = Vec::with_capacity((row.len() + 1) / 2);
        for pair in row.chunks(2) {
            let right = pair.get(1).unwrap_or(&pair[0]);
            next.push(double_sha256_two_32(&pair[0], right));
        }
        row = next;
    }
    row[0]
}

/// Serialize a block message: zeroed p2p header, 80-byte block header with
/// the real merkle root, varint transaction count, transaction bodies
pub fn build_block(txs: &[Vec<u8>]) -> Vec<u8> {
    build_block_with_version(txs, 4)
}

pub fn build_block_with_version(txs: &[Vec<u8>], version: u32) -> Vec<u8> {
    let mut block = vec![0u8; BLOCK_MSG_HEADER_LEN];
    block.extend_from_slice(&version.to_le_bytes());
    block.extend_from_slice(&[0x11u8; 32]); // prev block hash
    block.extend_from_slice(&merkle_root(txs));
    block.extend_from_slice(&1_700_000_000u32.to_le_bytes()); // time
    block.extend_from_slice(&0x1d00_ffffu32.to_le_bytes()); // bits
    block.extend_from_slice(&42u32.to_le_bytes()); // nonce
    block.extend_from_slice(&write_varint(txs.len() as u64));
    for tx in txs {
        block.extend_from_slice(tx);
    }
    block
}

/// Real hash of the 80-byte block header
pub fn block_hash_of(block: &[u8]) -> [u8; 32] {
    double_sha256(&block[BLOCK_MSG_HEADER_LEN..BLOCK_MSG_HEADER_LEN + 80])
}

/// A canonical-looking hash that satisfies the leading-zero difficulty gate
pub fn hash_with_work(tag: u8) -> [u8; 32] {
    let mut hash = [0u8; 32];
    hash[0] = tag;
    hash
}
