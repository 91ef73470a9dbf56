//! The error taxonomy exposed by this crate (spec.md §7).

use std::io;

use thiserror::Error;

/// Why a file parsed but failed a semantic check.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationReason {
    /// The running output count didn't match the header's `utxo_count`.
    #[error("UTXO count mismatch: header declared {declared}, read {actual}")]
    CountMismatch { declared: u64, actual: u64 },
    /// A txid-sized field didn't decode to 32 bytes.
    #[error("invalid txid")]
    InvalidTxid,
    /// A compressed script failed to decode or decompress.
    #[error("invalid script")]
    InvalidScript,
    /// A compressed amount decompressed to an invalid or overflowing value.
    #[error("invalid amount")]
    InvalidAmount,
    /// The stream ended before the declared record was fully read.
    #[error("truncated record")]
    Truncated,
    /// The network magic didn't match any known network.
    #[error("unknown network magic")]
    UnknownNetwork,
    /// The leading file magic didn't match the expected bytes.
    #[error("unknown file magic")]
    UnknownMagic,
}

/// A malformed or internally inconsistent byte stream.
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// Malformed or inconsistent bytes: wrong magic, truncated record,
    /// non-canonical CompactSize, an out-of-range CompactSize or VarInt,
    /// an off-curve secp256k1 point, or a script tag whose payload
    /// doesn't fit.
    #[error("format error{}: {reason}", offset.map(|o| format!(" at offset {o}")).unwrap_or_default())]
    Format {
        reason: &'static str,
        offset: Option<u64>,
    },

    /// The file's version field is not in the supported set.
    #[error("unsupported version {found} (expected one of {supported:?})")]
    Version { found: u16, supported: &'static [u16] },

    /// The file parsed but failed a semantic check.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationReason),

    /// The underlying byte stream failed.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl SnapshotError {
    pub(crate) fn format(reason: &'static str) -> Self {
        SnapshotError::Format {
            reason,
            offset: None,
        }
    }

    pub(crate) fn format_at(reason: &'static str, offset: u64) -> Self {
        SnapshotError::Format {
            reason,
            offset: Some(offset),
        }
    }
}

pub type Result<T> = std::result::Result<T, SnapshotError>;
