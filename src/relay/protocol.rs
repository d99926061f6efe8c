//! Relay protocol wire constants and message header codec
//!
//! The relay protocol frames every message with a fixed 12-byte header of
//! three big-endian u32 fields: magic, message type, and a length whose
//! meaning depends on the type. For a transaction message it is the byte
//! length of the transaction; for a block message it carries the number of
//! transactions in the compressed block body.

use crate::varint::{ByteCursor, ReadError};

/// Protocol magic, first field of every relay message header
pub const RELAY_MAGIC_BYTES: u32 = 0xF2BE_EF42;

/// Relay message types
pub const VERSION_TYPE: u32 = 0;
pub const BLOCK_TYPE: u32 = 1;
pub const TRANSACTION_TYPE: u32 = 2;
pub const END_BLOCK_TYPE: u32 = 3;

/// Size of the relay message header on the wire
pub const RELAY_MSG_HEADER_LEN: usize = 12;

/// Wire index value marking an inline transaction in a compressed block.
/// Cache indices are always below this, so it can never name a real entry.
pub const INLINE_TX_SENTINEL: u16 = 0xffff;

/// Largest transaction count a block message may declare
pub const MAX_BLOCK_TRANSACTIONS: u64 = 100_000;

/// Size of the legacy p2p message header that prefixes a full block
/// (magic 4 + command 12 + length 4 + checksum 4)
pub const BLOCK_MSG_HEADER_LEN: usize = 24;

/// Fixed 12-byte relay message header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayMsgHeader {
    pub magic: u32,
    pub msg_type: u32,
    pub length: u32,
}

impl RelayMsgHeader {
    pub fn new(msg_type: u32, length: u32) -> Self {
        Self {
            magic: RELAY_MAGIC_BYTES,
            msg_type,
            length,
        }
    }

    /// Serialize to wire form, all fields big-endian
    pub fn encode(&self) -> [u8; RELAY_MSG_HEADER_LEN] {
        let mut out = [0u8; RELAY_MSG_HEADER_LEN];
        out[0..4].copy_from_slice(&self.magic.to_be_bytes());
        out[4..8].copy_from_slice(&self.msg_type.to_be_bytes());
        out[8..12].copy_from_slice(&self.length.to_be_bytes());
        out
    }

    /// Parse from wire form
    pub fn decode(bytes: &[u8]) -> Result<Self, ReadError> {
        let mut cursor = ByteCursor::new(bytes);
        let header = Self {
            magic: cursor.read_u32_be()?,
            msg_type: cursor.read_u32_be()?,
            length: cursor.read_u32_be()?,
        };
        Ok(header)
    }
}

/// Build the wire message relaying a single transaction
pub fn tx_msg(tx: &[u8]) -> Vec<u8> {
    let header = RelayMsgHeader::new(TRANSACTION_TYPE, tx.len() as u32);
    let mut msg = Vec::with_capacity(RELAY_MSG_HEADER_LEN + tx.len());
    msg.extend_from_slice(&header.encode());
    msg.extend_from_slice(tx);
    msg
}
