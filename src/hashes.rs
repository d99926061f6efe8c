//! Double SHA256 hashing primitives
//!
//! All identity and integrity hashing in the relay path uses the standard
//! blockchain double SHA256: block hashes, transaction hashes, and merkle
//! tree calculations.

use sha2::{Digest, Sha256};

/// Calculate double SHA256 hash
///
/// # Arguments
/// * `data` - The data to hash
///
/// # Returns
/// 32-byte hash as array
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    let first_hash = Sha256::digest(data);
    let second_hash = Sha256::digest(first_hash);

    let mut result = [0u8; 32];
    result.copy_from_slice(&second_hash);
    result
}

/// Calculate double SHA256 over two concatenated 32-byte inputs
///
/// This is the merkle tree inner-node hash: the two child hashes are fed
/// through one SHA256 pass and the digest is hashed again.
pub fn double_sha256_two_32(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(a);
    hasher.update(b);
    let first_hash = hasher.finalize();
    let second_hash = Sha256::digest(first_hash);

    let mut result = [0u8; 32];
    result.copy_from_slice(&second_hash);
    result
}

/// Calculate the block hash from the 80-byte block header at `header_offset`
///
/// The hash covers exactly the 80 header bytes, not the transactions.
pub fn block_hash(block: &[u8], header_offset: usize) -> [u8; 32] {
    double_sha256(&block[header_offset..header_offset + 80])
}
