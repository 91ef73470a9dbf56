//! Process-wide constants for the dumptxoutset v2 format.
//!
//! No mutable global state lives here: the file magic, the supported
//! version set, and the per-network magics are the only process-wide
//! facts this crate needs, and all three are fixed by the format.

/// The 5-byte file magic at offset 0 of every snapshot.
pub const FILE_MAGIC: [u8; 5] = [0x75, 0x74, 0x78, 0x6f, 0xff];

/// The only version this crate understands.
pub const SUPPORTED_VERSION: u16 = 2;

/// Byte offset of the header's `network_magic` field.
pub const NETWORK_MAGIC_OFFSET: u64 = 7;

/// Byte offset of the header's `utxo_count` field, patched by the writer
/// at `finalize`/`update_utxo_count` time.
pub const UTXO_COUNT_OFFSET: u64 = 43;

/// Total size in bytes of the fixed header.
pub const HEADER_LEN: u64 = 51;

/// CompactSize values above this are rejected by range-checked reads
/// (32 MiB; spec.md §4.1).
pub const COMPACT_SIZE_LIMIT: u64 = 0x0200_0000;

pub const MAINNET_MAGIC: [u8; 4] = [0xf9, 0xbe, 0xb4, 0xd9];
pub const SIGNET_MAGIC: [u8; 4] = [0x0a, 0x03, 0xcf, 0x40];
pub const TESTNET3_MAGIC: [u8; 4] = [0x0b, 0x11, 0x09, 0x07];
pub const TESTNET4_MAGIC: [u8; 4] = [0x1c, 0x16, 0x3f, 0x28];
pub const REGTEST_MAGIC: [u8; 4] = [0xfa, 0xbf, 0xb5, 0xda];
