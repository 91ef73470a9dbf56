//! Header, transaction, and output value types (spec.md §3).

use std::fmt;
use std::io::{self, Read, Write};

use crate::network::Network;

macro_rules! hash_newtype {
    ($name:ident, $debug_label:expr) => {
        /// 32 bytes, stored in on-disk order; `Display`/`Debug` render the
        /// reversed *display* order, matching the convention the network
        /// uses for hex-printed hashes.
        #[derive(Copy, Clone, Eq, PartialEq, Hash)]
        pub struct $name(pub [u8; 32]);

        impl $name {
            /// Construct directly from on-disk-order bytes.
            pub fn from_disk_order(bytes: [u8; 32]) -> Self {
                $name(bytes)
            }

            /// The raw on-disk-order bytes.
            pub fn as_disk_order(&self) -> &[u8; 32] {
                &self.0
            }

            pub(crate) fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
                let mut bytes = [0u8; 32];
                reader.read_exact(&mut bytes)?;
                Ok($name(bytes))
            }

            pub(crate) fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
                writer.write_all(&self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let mut reversed = self.0;
                reversed.reverse();
                f.write_str(&hex::encode(reversed))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let mut reversed = self.0;
                reversed.reverse();
                f.debug_tuple($debug_label)
                    .field(&hex::encode(reversed))
                    .finish()
            }
        }
    };
}

hash_newtype!(BlockHash, "BlockHash");
hash_newtype!(Txid, "Txid");

/// The fixed 51-byte header at the start of every snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub version: u16,
    pub network: Network,
    pub network_magic: [u8; 4],
    pub block_hash: BlockHash,
    pub utxo_count: u64,
}

/// A group of outputs sharing a txid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub txid: Txid,
    pub outputs: Vec<Output>,
}

/// A single unspent output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub vout: u64,
    pub height: u32,
    pub is_coinbase: bool,
    pub amount: u64,
    pub script_pub_key: Vec<u8>,
}

/// An [`Output`] paired with the txid of the transaction it belongs to,
/// as yielded by [`crate::reader::Reader::read_entries`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub txid: Txid,
    pub output: Output,
}
