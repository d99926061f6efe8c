//! Wire-level decompression behavior against hand-built compressed bodies

mod common;

use std::sync::Arc;

use relay_node::{DecompressError, RelayNode};

/// 80-byte block header bytes with the given version field
fn header_bytes(version: u32) -> Vec<u8> {
    common::build_block_with_version(&[common::build_tx(1, 90)], version)[24..104].to_vec()
}

fn decompress(
    node: &RelayNode,
    body: &[u8],
    tx_count: u32,
) -> Result<relay_node::DecompressedBlock, DecompressError> {
    let mut reader = body;
    node.decompress_relay_block(&mut reader, tx_count, false)
}

#[test]
fn test_rejects_excessive_tx_count() {
    let node = RelayNode::default();
    assert_eq!(
        decompress(&node, &[], 100_001),
        Err(DecompressError::TooManyTransactions)
    );
}

#[test]
fn test_rejects_short_header() {
    let node = RelayNode::default();
    assert_eq!(
        decompress(&node, &header_bytes(4)[..79], 1),
        Err(DecompressError::BlockHeaderRead)
    );
}

#[test]
fn test_rejects_old_block_version() {
    let node = RelayNode::default();
    assert_eq!(
        decompress(&node, &header_bytes(3), 1),
        Err(DecompressError::SmallVersion)
    );
}

#[test]
fn test_rejects_unworked_hash_when_checking_merkle() {
    // a crafted header will not hash under the difficulty target
    let node = RelayNode::default();
    let body = header_bytes(4);
    let mut reader = &body[..];
    assert_eq!(
        node.decompress_relay_block(&mut reader, 1, true),
        Err(DecompressError::BadWork)
    );
}

#[test]
fn test_rejects_missing_tx_index() {
    let node = RelayNode::default();
    assert_eq!(
        decompress(&node, &header_bytes(4), 1),
        Err(DecompressError::TxIndexRead)
    );
}

#[test]
fn test_rejects_short_tx_length() {
    let node = RelayNode::default();
    let mut body = header_bytes(4);
    body.extend_from_slice(&[0xff, 0xff, 0x00]);
    assert_eq!(
        decompress(&node, &body, 1),
        Err(DecompressError::TxLengthRead)
    );
}

#[test]
fn test_rejects_unreasonably_large_tx() {
    let node = RelayNode::default();
    let mut body = header_bytes(4);
    // 0x100000 = 1048576 bytes, just over the cap
    body.extend_from_slice(&[0xff, 0xff, 0x10, 0x00, 0x00]);
    assert_eq!(decompress(&node, &body, 1), Err(DecompressError::OversizeTx));
}

#[test]
fn test_rejects_short_tx_body() {
    let node = RelayNode::default();
    let mut body = header_bytes(4);
    body.extend_from_slice(&[0xff, 0xff, 0x00, 0x00, 0x0a]);
    body.extend_from_slice(&[0u8; 5]);
    assert_eq!(decompress(&node, &body, 1), Err(DecompressError::TxDataRead));
}

#[test]
fn test_rejects_reference_into_empty_cache() {
    let node = RelayNode::default();
    let mut body = header_bytes(4);
    body.extend_from_slice(&[0x00, 0x05]);
    assert_eq!(decompress(&node, &body, 1), Err(DecompressError::MissingTx));
}

#[test]
fn test_failed_decompression_leaves_cache_intact() {
    let node = RelayNode::default();
    for seed in 0..2 {
        node.recv_tx(Arc::new(common::build_tx(seed, 80)));
    }

    // second reference is out of range; the first must not be consumed
    let mut body = header_bytes(4);
    body.extend_from_slice(&[0x00, 0x00, 0x00, 0x07]);
    assert_eq!(decompress(&node, &body, 2), Err(DecompressError::MissingTx));

    // both entries are still present and pull out in order
    let mut body = header_bytes(4);
    body.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
    let result = decompress(&node, &body, 2).unwrap();
    assert_eq!(result.wire_bytes, 12 + 2 + 2);

    let expected: Vec<u8> = common::build_tx(0, 80)
        .into_iter()
        .chain(common::build_tx(1, 80))
        .collect();
    assert_eq!(&result.block[result.block.len() - 160..], &expected[..]);
}

#[test]
fn test_decompressed_header_prefix_is_zeroed() {
    let node = RelayNode::default();
    let tx = common::build_tx(3, 70);
    let mut body = header_bytes(4);
    body.extend_from_slice(&[0xff, 0xff, 0x00, 0x00, 70]);
    body.extend_from_slice(&tx);

    let result = decompress(&node, &body, 1).unwrap();
    assert!(result.block[..24].iter().all(|&b| b == 0));
    assert_eq!(&result.block[24..104], &header_bytes(4)[..]);
}
