//! Streaming snapshot reader (spec.md §4.6).
//!
//! Grounded on the reference UTXO-dump parser's `Dump<R>` iterator: a
//! state machine over a generic `Read` stream that lazily yields
//! transactions (or individual outputs) while tracking the running
//! count against the header's declared total.

use std::io::{self, Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::amount::decompress_amount;
use crate::compact_size::read_compact_size;
use crate::constants::{FILE_MAGIC, HEADER_LEN, SUPPORTED_VERSION};
use crate::error::{Result, SnapshotError, ValidationReason};
use crate::model::{Entry, Header, Output, Transaction, Txid};
use crate::network::Network;
use crate::script;
use crate::varint::read_varint;

/// A `Read` (and, when available, `Seek`) adapter that tracks the number
/// of bytes consumed so far, so decode failures can be logged and
/// reported against a byte offset without requiring the underlying
/// stream itself to support seeking.
struct CountingReader<R> {
    inner: R,
    position: u64,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.position += n as u64;
        Ok(n)
    }
}

impl<R: Seek> Seek for CountingReader<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let new_position = self.inner.seek(pos)?;
        self.position = new_position;
        Ok(new_position)
    }
}

/// Wrap a decode failure's error with a `log::debug!` of the field and
/// byte offset it occurred at, mirroring the reference `txoutset`
/// parser's per-field `log::error!` wrapping. Upgrades a bare
/// `SnapshotError::Format` (constructed without offset information by
/// the lower-level codecs) to carry the offset this call site knows.
fn trace_field<T>(field: &'static str, offset: u64, result: Result<T>) -> Result<T> {
    result.map_err(|e| {
        log::debug!("failed to decode {field} at offset {offset}: {e}");
        match e {
            SnapshotError::Format { reason, offset: None } => {
                SnapshotError::format_at(reason, offset)
            }
            other => other,
        }
    })
}

/// Reads a `dumptxoutset` v2 snapshot from `R`.
///
/// Owns its stream for the reader's lifetime unless constructed with
/// [`Reader::new_leave_open`], in which case `Drop` does not close it.
pub struct Reader<R> {
    stream: CountingReader<R>,
    header: Option<Header>,
    emitted: u64,
    leave_open: bool,
}

impl<R: Read> Reader<R> {
    /// Wrap `stream`, taking ownership of it.
    pub fn new(stream: R) -> Self {
        Reader {
            stream: CountingReader { inner: stream, position: 0 },
            header: None,
            emitted: 0,
            leave_open: false,
        }
    }

    /// Wrap `stream` without taking ownership semantics: `Drop` will not
    /// attempt to flush or otherwise act on it beyond dropping the value.
    pub fn new_leave_open(stream: R) -> Self {
        Reader {
            stream: CountingReader { inner: stream, position: 0 },
            header: None,
            emitted: 0,
            leave_open: true,
        }
    }

    /// Parse and cache the 51-byte header. A second call returns the
    /// cached copy without touching the stream.
    pub fn read_header(&mut self) -> Result<Header> {
        if let Some(header) = &self.header {
            return Ok(header.clone());
        }

        let mut magic = [0u8; 5];
        self.stream.read_exact(&mut magic)?;
        if magic != FILE_MAGIC {
            log::debug!("unrecognized file magic: {magic:02x?}");
            return Err(SnapshotError::Validation(ValidationReason::UnknownMagic));
        }

        let version = self.stream.read_u16::<LittleEndian>()?;
        if version != SUPPORTED_VERSION {
            return Err(SnapshotError::Version {
                found: version,
                supported: &[SUPPORTED_VERSION],
            });
        }

        let mut network_magic = [0u8; 4];
        self.stream.read_exact(&mut network_magic)?;
        let network = Network::from_magic(network_magic);

        let block_hash = crate::model::BlockHash::read(&mut self.stream)?;
        let utxo_count = self.stream.read_u64::<LittleEndian>()?;

        let header = Header {
            version,
            network,
            network_magic,
            block_hash,
            utxo_count,
        };
        self.header = Some(header.clone());
        Ok(header)
    }

    /// Lazily yield transactions until the stream is exhausted, then a
    /// single trailing `Err` if the running output count disagrees with
    /// the header's `utxo_count`.
    pub fn read_transactions(&mut self) -> TransactionIter<'_, R> {
        TransactionIter {
            reader: self,
            finished: false,
        }
    }

    /// Lazily yield individual outputs, each paired with its
    /// transaction's txid, flattening the transaction grouping.
    pub fn read_entries(&mut self) -> EntryIter<'_, R> {
        EntryIter {
            reader: self,
            pending: Vec::new().into_iter(),
            pending_txid: None,
            finished: false,
        }
    }

    /// Drive the reader to completion, discarding the decoded values and
    /// returning only success or the first error encountered.
    pub fn validate(&mut self) -> Result<()> {
        self.read_header()?;
        let mut iter = self.read_transactions();
        while let Some(result) = iter.next() {
            result?;
        }
        Ok(())
    }

    fn read_output(&mut self) -> Result<Output> {
        let offset = self.stream.position;
        let vout = trace_field("vout", offset, read_compact_size(&mut self.stream, true))?;

        let offset = self.stream.position;
        let height_flag = trace_field("height/coinbase flag", offset, read_varint(&mut self.stream))?;
        let is_coinbase = height_flag & 1 != 0;
        let height = (height_flag >> 1) as u32;

        let offset = self.stream.position;
        let compressed_amount =
            trace_field("compressed amount", offset, read_varint(&mut self.stream))?;
        let amount = decompress_amount(compressed_amount);

        let offset = self.stream.position;
        let script_pub_key = trace_field("scriptPubKey", offset, script::decode(&mut self.stream))?;

        Ok(Output {
            vout,
            height,
            is_coinbase,
            amount,
            script_pub_key,
        })
    }

    /// Reads one transaction record, or `None` at a clean end-of-stream
    /// (no bytes consumed before hitting EOF).
    fn read_next_transaction(&mut self) -> Result<Option<Transaction>> {
        let mut first = [0u8; 1];
        let n = self.stream.read(&mut first)?;
        if n == 0 {
            return Ok(None);
        }

        let offset = self.stream.position - 1;
        let mut rest = [0u8; 31];
        trace_field("txid", offset, self.stream.read_exact(&mut rest).map_err(SnapshotError::from))?;
        let mut txid_bytes = [0u8; 32];
        txid_bytes[0] = first[0];
        txid_bytes[1..].copy_from_slice(&rest);
        let txid = Txid::from_disk_order(txid_bytes);

        let offset = self.stream.position;
        let count = trace_field(
            "output count",
            offset,
            read_compact_size(&mut self.stream, true),
        )?;
        let mut outputs = Vec::with_capacity(count.min(1 << 20) as usize);
        for _ in 0..count {
            outputs.push(self.read_output()?);
        }

        self.emitted += outputs.len() as u64;
        Ok(Some(Transaction { txid, outputs }))
    }

    fn check_final_count(&self) -> Result<()> {
        let declared = self
            .header
            .as_ref()
            .map(|h| h.utxo_count)
            .unwrap_or_default();
        if declared != self.emitted {
            return Err(SnapshotError::Validation(ValidationReason::CountMismatch {
                declared,
                actual: self.emitted,
            }));
        }
        Ok(())
    }
}

impl<R: Read + Seek> Reader<R> {
    /// Seek to the start of the stream and clear the cached header and
    /// running count, so the reader can be used again from scratch.
    pub fn reset(&mut self) -> Result<()> {
        self.stream.seek(SeekFrom::Start(0))?;
        self.header = None;
        self.emitted = 0;
        Ok(())
    }
}

impl<R> Drop for Reader<R> {
    fn drop(&mut self) {
        // Owned streams (files, sockets) close themselves when `R` drops;
        // nothing extra to flush on the read side. `leave_open` exists
        // purely as a documented contract for callers inspecting it.
        let _ = self.leave_open;
    }
}

/// Lazy sequence of [`Transaction`] records, returned by
/// [`Reader::read_transactions`].
pub struct TransactionIter<'r, R> {
    reader: &'r mut Reader<R>,
    finished: bool,
}

impl<'r, R: Read> Iterator for TransactionIter<'r, R> {
    type Item = Result<Transaction>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.reader.read_next_transaction() {
            Ok(Some(tx)) => Some(Ok(tx)),
            Ok(None) => {
                self.finished = true;
                match self.reader.check_final_count() {
                    Ok(()) => None,
                    Err(e) => Some(Err(e)),
                }
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// Lazy sequence of [`Entry`] values (one per output), returned by
/// [`Reader::read_entries`].
pub struct EntryIter<'r, R> {
    reader: &'r mut Reader<R>,
    pending: std::vec::IntoIter<Output>,
    pending_txid: Option<Txid>,
    finished: bool,
}

impl<'r, R: Read> Iterator for EntryIter<'r, R> {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(output) = self.pending.next() {
                let txid = self.pending_txid.expect("pending output implies pending txid");
                return Some(Ok(Entry { txid, output }));
            }

            if self.finished {
                return None;
            }

            match self.reader.read_next_transaction() {
                Ok(Some(tx)) => {
                    self.pending_txid = Some(tx.txid);
                    self.pending = tx.outputs.into_iter();
                }
                Ok(None) => {
                    self.finished = true;
                    if let Err(e) = self.reader.check_final_count() {
                        return Some(Err(e));
                    }
                    return None;
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BlockHash;
    use std::io::Cursor;

    fn minimal_header_bytes(utxo_count: u64) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&FILE_MAGIC);
        bytes.extend_from_slice(&SUPPORTED_VERSION.to_le_bytes());
        bytes.extend_from_slice(&crate::constants::REGTEST_MAGIC);
        bytes.extend_from_slice(&[0u8; 32]);
        bytes.extend_from_slice(&utxo_count.to_le_bytes());
        bytes
    }

    #[test]
    fn scenario_1_minimal_header_roundtrip() {
        let bytes = minimal_header_bytes(0);
        assert_eq!(bytes.len(), HEADER_LEN as usize);

        let mut reader = Reader::new(Cursor::new(bytes));
        let header = reader.read_header().unwrap();
        assert_eq!(header.version, 2);
        assert_eq!(header.network, Network::Regtest);
        assert_eq!(header.block_hash, BlockHash::from_disk_order([0u8; 32]));
        assert_eq!(header.utxo_count, 0);

        assert!(reader.read_transactions().next().is_none());
    }

    #[test]
    fn header_is_cached_after_first_read() {
        let mut reader = Reader::new(Cursor::new(minimal_header_bytes(0)));
        let first = reader.read_header().unwrap();
        let second = reader.read_header().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn rejects_unsupported_version() {
        let mut bytes = minimal_header_bytes(0);
        bytes[5] = 1; // version = 1
        let mut reader = Reader::new(Cursor::new(bytes));
        assert_matches::assert_matches!(
            reader.read_header(),
            Err(SnapshotError::Version { found: 1, .. })
        );
    }

    #[test]
    fn rejects_unknown_file_magic() {
        let mut bytes = minimal_header_bytes(0);
        bytes[0] = 0x00;
        let mut reader = Reader::new(Cursor::new(bytes));
        assert_matches::assert_matches!(
            reader.read_header(),
            Err(SnapshotError::Validation(ValidationReason::UnknownMagic))
        );
    }

    #[test]
    fn scenario_6_count_mismatch_rejected() {
        let mut bytes = minimal_header_bytes(2);

        // One transaction record with a single output.
        bytes.extend_from_slice(&[0x01; 32]); // txid
        bytes.push(1); // output count (CompactSize)
        bytes.push(0); // vout CompactSize = 0
        bytes.push(0x00); // height<<1|coinbase VarInt = 0
        bytes.push(0x00); // compressed amount VarInt = 0
        bytes.push(0x06); // raw-script tag for zero-length script

        let mut reader = Reader::new(Cursor::new(bytes));
        let err = reader.validate().unwrap_err();
        assert_matches::assert_matches!(
            err,
            SnapshotError::Validation(ValidationReason::CountMismatch {
                declared: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn reset_clears_cached_state() {
        let bytes = minimal_header_bytes(0);
        let mut reader = Reader::new(Cursor::new(bytes));
        reader.read_header().unwrap();
        reader.reset().unwrap();
        assert!(reader.header.is_none());
        let header = reader.read_header().unwrap();
        assert_eq!(header.utxo_count, 0);
    }

    #[test]
    fn decode_failure_reports_byte_offset() {
        let mut bytes = minimal_header_bytes(1);
        bytes.extend_from_slice(&[0x02; 32]); // txid
        bytes.extend_from_slice(&[0xfd, 0xfc, 0x00]); // non-canonical output count

        let mut reader = Reader::new(Cursor::new(bytes));
        reader.read_header().unwrap();
        let err = reader.read_transactions().next().unwrap().unwrap_err();
        assert_matches::assert_matches!(
            err,
            SnapshotError::Format {
                offset: Some(offset),
                ..
            } if offset == HEADER_LEN + 32
        );
    }
}
