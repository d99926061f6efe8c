//! Incremental merkle root verification
//!
//! Holds one 32-byte hash slot per transaction and folds the slots in place
//! to a single root. The fold rejects any row whose final pair of distinct
//! positions holds byte-equal hashes, which blocks the known malleability
//! trick of duplicating the last transaction hash in an odd-length row.

use crate::hashes::double_sha256_two_32;

/// Per-transaction hash buffer folded in place to the merkle root
pub struct MerkleTreeBuilder {
    hashes: Vec<[u8; 32]>,
}

impl MerkleTreeBuilder {
    /// Reserve slots for `tx_count` transaction hashes
    ///
    /// A single slot is always allocated so that `root_matches` on a
    /// one-transaction block degenerates to a plain comparison.
    pub fn new(tx_count: usize) -> Self {
        Self {
            hashes: vec![[0u8; 32]; tx_count.max(1)],
        }
    }

    /// Writable 32-byte slot for transaction `i`
    pub fn slot_mut(&mut self, i: usize) -> &mut [u8; 32] {
        &mut self.hashes[i]
    }

    /// Fold the buffer pairwise and compare the result against `expected`
    ///
    /// Consumes the buffer contents: each row is hashed into the front of
    /// the buffer, reusing the leaf storage. Returns false either when a
    /// duplicated final sibling is detected or when the folded root differs
    /// from `expected`.
    pub fn root_matches(&mut self, expected: &[u8; 32]) -> bool {
        let tx_count = self.hashes.len();
        let mut step = 1usize;
        let mut last_max = tx_count - 1;

        let mut row_size = tx_count;
        while row_size > 1 {
            if self.hashes[last_max - step] == self.hashes[last_max] {
                return false;
            }

            let mut i = 0;
            while i < row_size {
                let right = ((i + 1) * step).min(last_max);
                let parent = double_sha256_two_32(&self.hashes[i * step], &self.hashes[right]);
                self.hashes[i * step] = parent;
                i += 2;
            }

            last_max = ((row_size - 1) & !1usize) * step;
            step *= 2;
            row_size = (row_size + 1) / 2;
        }

        self.hashes[0] == *expected
    }
}
