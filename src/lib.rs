//! Streaming reader and writer for Bitcoin Core `dumptxoutset` (version 2)
//! UTXO snapshot files.
//!
//! A snapshot is a fixed 51-byte header followed by a sequence of
//! per-transaction records, each holding a variable number of outputs.
//! This crate covers the codec only: CompactSize and VarInt integer
//! encodings, compressed-amount and compressed-script (de)serialization,
//! secp256k1 key recovery, and the [`Reader`]/[`Writer`] state machines
//! built on top of them. Command-line dispatch, export formatting, and
//! address encoding are left to callers.

mod amount;
mod compact_size;
mod constants;
mod ec;
mod error;
mod model;
mod network;
mod reader;
mod script;
mod varint;
mod writer;

pub use error::{Result, SnapshotError, ValidationReason};
pub use model::{BlockHash, Entry, Header, Output, Transaction, Txid};
pub use network::Network;
pub use reader::{EntryIter, Reader, TransactionIter};
pub use writer::Writer;

pub mod codec {
    //! The low-level integer, amount, and key encodings that back the
    //! [`Reader`](crate::Reader)/[`Writer`](crate::Writer) state
    //! machines, exposed for callers building their own framing on top
    //! of the same primitives.

    pub use crate::amount::{compress_amount, decompress_amount};
    pub use crate::compact_size::{compact_size_len, read_compact_size, write_compact_size};
    pub use crate::ec::{compress as compress_pubkey, decompress as decompress_pubkey};
    pub use crate::script::{decode as decode_script, encode as encode_script};
    pub use crate::varint::{read_varint, varint_len, write_varint};
}
