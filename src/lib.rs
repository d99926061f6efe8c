//! relay-node - bandwidth-minimizing block relay for blockchain peers
//!
//! Freshly-mined blocks consist almost entirely of transactions both peers
//! have already exchanged. This crate compresses a full serialized block
//! against a per-peer cache of recently-relayed transactions: every cached
//! transaction is replaced by a 2-byte index into the peer's matching
//! cache, and only transactions the peer cannot know travel inline. The
//! inverse operation rehydrates the identical full block on the other side.
//!
//! ## Design
//!
//! - Each peering owns a [`RelayNode`]: a send cache, a recv cache, and a
//!   duplicate-block filter behind one mutex
//! - Cache indices are a shared name space; both sides evict entries in
//!   the same order, and the decoder rewrites indices to account for
//!   entries the encoder had already consumed
//! - Optional incremental merkle-root verification hashes each transaction
//!   exactly once while it is being parsed
//!
//! Socket I/O, message framing, and block dissemination belong to the
//! embedding peer; decompression only needs a [`std::io::Read`] for the
//! compressed body.

pub mod cache;
pub mod config;
pub mod hashes;
pub mod merkle;
pub mod relay;
pub mod utils;
pub mod varint;

pub use cache::{TxCache, TxCacheLimits, MAX_CACHED_TRANSACTIONS};
pub use config::{LoggingConfig, RelayConfig};
pub use merkle::MerkleTreeBuilder;
pub use relay::compress::CompressError;
pub use relay::decompress::{DecompressError, DecompressedBlock, MAX_INLINE_TX_BYTES};
pub use relay::protocol::{
    RelayMsgHeader, BLOCK_MSG_HEADER_LEN, BLOCK_TYPE, END_BLOCK_TYPE, INLINE_TX_SENTINEL,
    MAX_BLOCK_TRANSACTIONS, RELAY_MAGIC_BYTES, RELAY_MSG_HEADER_LEN, TRANSACTION_TYPE,
    VERSION_TYPE,
};
pub use relay::RelayNode;
