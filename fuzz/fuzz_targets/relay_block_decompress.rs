#![no_main]
use libfuzzer_sys::fuzz_target;
use relay_node::RelayNode;
use std::sync::Arc;

fuzz_target!(|data: &[u8]| {
    // Decompress arbitrary bytes as a compressed block body. The first
    // three bytes steer the declared tx count, merkle checking, and how
    // many entries to seed into the recv cache so index references
    // sometimes resolve.
    if data.len() < 3 {
        return;
    }
    let tx_count = u16::from_le_bytes([data[0], data[1]]) as u32;
    let check_merkle = data[2] & 1 == 1;
    let seed_entries = data[2] >> 4;

    let node = RelayNode::default();
    for i in 0..seed_entries {
        let tx = Arc::new(vec![i; 64 + i as usize]);
        if node.maybe_recv_tx_of_size(tx.len()) {
            node.recv_tx(tx);
        }
    }

    let mut body = &data[3..];
    let _ = node.decompress_relay_block(&mut body, tx_count, check_merkle);
});
