//! Property suites for relay invariants

mod common;

use std::sync::Arc;

use proptest::prelude::*;
use relay_node::cache::{TxCache, TxCacheLimits};
use relay_node::hashes::double_sha256;
use relay_node::{RelayConfig, RelayNode};

proptest! {
    /// Any block built from a mix of cached and fresh transactions, in any
    /// rotation of the admission order, reconstructs byte-for-byte on a
    /// receiver whose recv cache tracked the sender's send cache.
    #[test]
    fn roundtrip_reconstructs_block(
        specs in prop::collection::vec((any::<bool>(), 60usize..300), 1..10),
        rot in 0usize..10,
    ) {
        let sender = RelayNode::default();
        let receiver = RelayNode::default();

        let txs: Vec<Vec<u8>> = specs
            .iter()
            .enumerate()
            .map(|(i, &(_, size))| common::build_tx(i as u8, size))
            .collect();

        for (tx, &(cached, _)) in txs.iter().zip(&specs) {
            if cached {
                let tx = Arc::new(tx.clone());
                prop_assert!(sender.get_relay_transaction(&tx).is_some());
                prop_assert!(receiver.maybe_recv_tx_of_size(tx.len()));
                receiver.recv_tx(tx);
            }
        }

        let mut block_txs = txs.clone();
        let len = block_txs.len();
        block_txs.rotate_left(rot % len);
        let block = common::build_block(&block_txs);
        let hash = common::block_hash_of(&block);

        let compressed = sender.maybe_compress_block(&hash, &block, false).unwrap();
        let mut body = &compressed[12..];
        let result = receiver
            .decompress_relay_block(&mut body, len as u32, false)
            .unwrap();

        prop_assert_eq!(&result.block[24..], &block[24..]);
        prop_assert_eq!(result.block_hash, hash);

        // every cached transaction in the block was consumed on the send side
        for tx in &txs {
            prop_assert!(!sender.was_tx_sent(&double_sha256(tx)));
        }
    }

    /// Cache accounting survives arbitrary interleavings of adds and
    /// removals without violating its capacity bounds.
    #[test]
    fn cache_accounting_stays_consistent(
        ops in prop::collection::vec((any::<u8>(), any::<bool>(), any::<bool>()), 1..60),
    ) {
        let mut cache = TxCache::new(TxCacheLimits {
            max_entries: 8,
            max_bytes: 2000,
        });

        for (seed, oversize, remove) in ops {
            if remove && !cache.is_empty() {
                let index = seed as usize % cache.len();
                prop_assert!(cache.remove_by_index(index).is_some());
            } else {
                cache.add(Arc::new(vec![seed; 20 + seed as usize % 30]), oversize);
            }
            prop_assert!(cache.len() <= 8);
            prop_assert!(cache.total_bytes() <= 2000);
            prop_assert!(cache.flag_count() <= cache.len());
        }
    }

    /// The admission pre-check and the admission itself agree: whenever
    /// `maybe_recv_tx_of_size` says yes, `recv_tx` accepts, and the legacy
    /// oversize budget is never exceeded.
    #[test]
    fn recv_admission_parity_under_old_flags(
        sizes in prop::collection::vec(60usize..2000, 1..40),
    ) {
        let config = RelayConfig {
            use_old_flags: true,
            old_max_relay_transaction_bytes: 100,
            old_max_extra_oversize_transactions: 3,
            old_max_relay_oversize_transaction_bytes: 1000,
            ..RelayConfig::default()
        };
        let node = RelayNode::new(config);

        let mut oversize_held = 0usize;
        for (i, size) in sizes.into_iter().enumerate() {
            let mut blob = vec![0u8; size];
            blob[0] = i as u8; // keep admissions distinct

            if node.maybe_recv_tx_of_size(size) {
                node.recv_tx(Arc::new(blob));
                if size > 100 {
                    oversize_held += 1;
                }
                prop_assert!(size <= 1000);
                prop_assert!(oversize_held <= 3);
            } else {
                // only oversize transactions are ever refused
                prop_assert!(size > 100);
            }
        }
    }
}
