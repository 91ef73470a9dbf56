//! Streaming snapshot writer (spec.md §4.7).

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::amount::compress_amount;
use crate::compact_size::write_compact_size;
use crate::constants::{FILE_MAGIC, SUPPORTED_VERSION, UTXO_COUNT_OFFSET};
use crate::error::{Result, SnapshotError, ValidationReason};
use crate::model::{Header, Output, Transaction};
use crate::script;
use crate::varint::write_varint;

/// Writes a `dumptxoutset` v2 snapshot to `W`.
///
/// `Drop` guarantees the header's `utxo_count` is patched and the stream
/// flushed on every exit path — early return, `?` propagation, or panic
/// unwinding through the stack — for any writer that wasn't already
/// finalized explicitly and isn't marked [`Writer::new_leave_open`]. That
/// guarantee is why `W` must be [`Seek`] here: patching an already-written
/// header means seeking back to it. [`Writer::with_known_count`] exists
/// for callers who already know the final count up front and would
/// rather commit it at `write_header` time than pay for the patch.
pub struct Writer<W: Write + Seek> {
    stream: W,
    header_written: bool,
    known_count: Option<u64>,
    emitted: u64,
    leave_open: bool,
    finalized: bool,
}

impl Writer<File> {
    /// Create a new snapshot file, refusing to overwrite an existing one
    /// unless `overwrite` is set.
    pub fn create(path: impl AsRef<Path>, overwrite: bool) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .create_new(!overwrite)
            .truncate(overwrite)
            .open(path)?;
        Ok(Writer::new(file))
    }
}

impl<W: Write + Seek> Writer<W> {
    /// Wrap `stream`, taking ownership of it.
    pub fn new(stream: W) -> Self {
        Writer {
            stream,
            header_written: false,
            known_count: None,
            emitted: 0,
            leave_open: false,
            finalized: false,
        }
    }

    /// Wrap `stream` without taking ownership semantics; `Drop` will not
    /// be relied upon to flush it or patch its header.
    pub fn new_leave_open(stream: W) -> Self {
        Writer {
            stream,
            header_written: false,
            known_count: None,
            emitted: 0,
            leave_open: true,
            finalized: false,
        }
    }

    /// Commit to `utxo_count` now instead of deferring the patch to
    /// [`Writer::finalize`]. Useful when the count is already known
    /// ahead of time and a second seek-and-rewrite pass is unwanted;
    /// `finalize`/`Drop` will reject a running count that disagrees
    /// with it rather than silently overwrite it.
    pub fn with_known_count(stream: W, utxo_count: u64) -> Self {
        Writer {
            stream,
            header_written: false,
            known_count: Some(utxo_count),
            emitted: 0,
            leave_open: false,
            finalized: false,
        }
    }

    /// Write the fixed 51-byte header. Must be called exactly once,
    /// before any transaction is written.
    ///
    /// If this writer was built with [`Writer::with_known_count`], the
    /// header's `utxo_count` is overridden with that committed value.
    pub fn write_header(&mut self, mut header: Header) -> Result<()> {
        if header.version != SUPPORTED_VERSION {
            return Err(SnapshotError::Version {
                found: header.version,
                supported: &[SUPPORTED_VERSION],
            });
        }
        if let Some(known) = self.known_count {
            header.utxo_count = known;
        }

        self.stream.write_all(&FILE_MAGIC)?;
        self.stream.write_u16::<LittleEndian>(header.version)?;
        self.stream.write_all(&header.network_magic)?;
        header.block_hash.write(&mut self.stream)?;
        self.stream.write_u64::<LittleEndian>(header.utxo_count)?;

        self.header_written = true;
        Ok(())
    }

    /// Write a transaction record. Transactions with no outputs are
    /// silently dropped, matching spec.md §3.
    pub fn write_transaction(&mut self, transaction: Transaction) -> Result<()> {
        if transaction.outputs.is_empty() {
            return Ok(());
        }

        transaction.txid.write(&mut self.stream)?;
        write_compact_size(&mut self.stream, transaction.outputs.len() as u64)?;
        for output in &transaction.outputs {
            self.write_output(output)?;
        }

        self.emitted += transaction.outputs.len() as u64;
        Ok(())
    }

    /// Convenience: write a single output as its own singleton
    /// transaction.
    pub fn write_entry(&mut self, txid: crate::model::Txid, output: Output) -> Result<()> {
        self.write_transaction(Transaction {
            txid,
            outputs: vec![output],
        })
    }

    fn write_output(&mut self, output: &Output) -> Result<()> {
        write_compact_size(&mut self.stream, output.vout)?;

        let height_flag = ((output.height as u64) << 1) | (output.is_coinbase as u64);
        write_varint(&mut self.stream, height_flag)?;

        let compressed_amount = compress_amount(output.amount);
        write_varint(&mut self.stream, compressed_amount)?;

        script::encode(&mut self.stream, &output.script_pub_key)?;
        Ok(())
    }

    /// Flush the underlying stream without patching the header's count.
    /// Useful for `with_known_count` writers, where there is nothing
    /// left to patch.
    pub fn flush(&mut self) -> Result<()> {
        self.stream.flush()?;
        Ok(())
    }

    /// Seek to the recorded offset and rewrite the 8-byte `utxo_count`
    /// field with the running emitted-entries count.
    pub fn update_utxo_count(&mut self, n: u64) -> Result<()> {
        if !self.header_written {
            return Err(SnapshotError::format("header not written yet"));
        }
        let current = self.stream.stream_position()?;
        self.stream.seek(SeekFrom::Start(UTXO_COUNT_OFFSET))?;
        self.stream.write_u64::<LittleEndian>(n)?;
        self.stream.seek(SeekFrom::Start(current))?;
        Ok(())
    }

    /// Patch the header's `utxo_count` with the running total and flush.
    /// `Drop` falls back to this same logic for writers that reach the
    /// end of their scope without it having been called explicitly.
    fn finalize_mut(&mut self) -> Result<()> {
        if self.header_written {
            if let Some(known) = self.known_count {
                if known != self.emitted {
                    return Err(SnapshotError::Validation(ValidationReason::CountMismatch {
                        declared: known,
                        actual: self.emitted,
                    }));
                }
            } else {
                self.update_utxo_count(self.emitted)?;
            }
        }
        self.stream.flush()?;
        Ok(())
    }

    /// Patch the header's `utxo_count` with the running total and flush.
    pub fn finalize(mut self) -> Result<()> {
        let result = self.finalize_mut();
        self.finalized = true;
        result
    }
}

impl<W: Write + Seek> Drop for Writer<W> {
    fn drop(&mut self) {
        if self.leave_open || self.finalized {
            return;
        }
        if let Err(e) = self.finalize_mut() {
            log::debug!("writer dropped without an explicit finalize: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlockHash, Txid};
    use crate::network::Network;
    use crate::reader::Reader;
    use std::io::Cursor;

    fn sample_header(utxo_count: u64) -> Header {
        Header {
            version: SUPPORTED_VERSION,
            network: Network::Regtest,
            network_magic: crate::constants::REGTEST_MAGIC,
            block_hash: BlockHash::from_disk_order([0u8; 32]),
            utxo_count,
        }
    }

    #[test]
    fn scenario_1_minimal_header_bytes() {
        let mut buf = Vec::new();
        {
            let mut writer = Writer::new(Cursor::new(&mut buf));
            writer.write_header(sample_header(0)).unwrap();
            writer.finalize().unwrap();
        }

        assert_eq!(buf.len(), crate::constants::HEADER_LEN as usize);
        assert_eq!(&buf[0..5], &FILE_MAGIC);
        assert_eq!(&buf[5..7], &[0x02, 0x00]);
        assert_eq!(&buf[7..11], &crate::constants::REGTEST_MAGIC);
        assert_eq!(&buf[11..43], &[0u8; 32]);
        assert_eq!(&buf[43..51], &[0u8; 8]);
    }

    #[test]
    fn finalize_patches_running_count() {
        let mut buf = Vec::new();
        {
            let mut writer = Writer::new(Cursor::new(&mut buf));
            writer.write_header(sample_header(0)).unwrap();
            writer
                .write_entry(
                    Txid::from_disk_order([0x01; 32]),
                    Output {
                        vout: 0,
                        height: 100,
                        is_coinbase: false,
                        amount: 5_000_000_000,
                        script_pub_key: vec![0x6a],
                    },
                )
                .unwrap();
            writer.finalize().unwrap();
        }

        let mut reader = Reader::new(Cursor::new(buf));
        let header = reader.read_header().unwrap();
        assert_eq!(header.utxo_count, 1);

        let tx = reader.read_transactions().next().unwrap().unwrap();
        assert_eq!(tx.outputs.len(), 1);
        assert_eq!(tx.outputs[0].amount, 5_000_000_000);
    }

    #[test]
    fn empty_transaction_is_dropped() {
        let mut buf = Vec::new();
        let mut writer = Writer::new(Cursor::new(&mut buf));
        writer.write_header(sample_header(0)).unwrap();
        writer
            .write_transaction(Transaction {
                txid: Txid::from_disk_order([0x02; 32]),
                outputs: vec![],
            })
            .unwrap();
        writer.finalize().unwrap();

        assert_eq!(buf.len(), crate::constants::HEADER_LEN as usize);
    }

    #[test]
    fn with_known_count_rejects_mismatched_finalize() {
        let mut buf = Vec::new();
        let mut writer = Writer::with_known_count(Cursor::new(&mut buf), 2);
        writer.write_header(sample_header(0)).unwrap();
        writer
            .write_entry(
                Txid::from_disk_order([0x03; 32]),
                Output {
                    vout: 0,
                    height: 1,
                    is_coinbase: true,
                    amount: 0,
                    script_pub_key: vec![],
                },
            )
            .unwrap();

        assert!(writer.finalize().is_err());
    }

    #[test]
    fn drop_without_finalize_still_patches_count() {
        let mut buf = Vec::new();
        {
            let mut writer = Writer::new(Cursor::new(&mut buf));
            writer.write_header(sample_header(0)).unwrap();
            writer
                .write_entry(
                    Txid::from_disk_order([0x05; 32]),
                    Output {
                        vout: 0,
                        height: 1,
                        is_coinbase: false,
                        amount: 0,
                        script_pub_key: vec![],
                    },
                )
                .unwrap();
            // Dropped here without an explicit `finalize()` call.
        }

        let mut reader = Reader::new(Cursor::new(buf));
        let header = reader.read_header().unwrap();
        assert_eq!(header.utxo_count, 1);
        reader.validate().unwrap();
    }

    #[test]
    fn leave_open_writer_does_not_patch_on_drop() {
        let mut buf = Vec::new();
        {
            let mut writer = Writer::new_leave_open(Cursor::new(&mut buf));
            writer.write_header(sample_header(0)).unwrap();
            writer
                .write_entry(
                    Txid::from_disk_order([0x06; 32]),
                    Output {
                        vout: 0,
                        height: 1,
                        is_coinbase: false,
                        amount: 0,
                        script_pub_key: vec![],
                    },
                )
                .unwrap();
        }

        let mut reader = Reader::new(Cursor::new(buf));
        let header = reader.read_header().unwrap();
        assert_eq!(header.utxo_count, 0);
    }

    #[test]
    fn roundtrip_through_reader_p2pkh_output() {
        let mut buf = Vec::new();
        let mut writer = Writer::new(Cursor::new(&mut buf));
        writer.write_header(sample_header(0)).unwrap();

        let p2pkh = {
            let mut s = vec![0x76, 0xa9, 0x14];
            s.extend_from_slice(&[0x11; 20]);
            s.push(0x88);
            s.push(0xac);
            s
        };

        writer
            .write_entry(
                Txid::from_disk_order([0x04; 32]),
                Output {
                    vout: 3,
                    height: 500_000,
                    is_coinbase: false,
                    amount: 100_000_000,
                    script_pub_key: p2pkh.clone(),
                },
            )
            .unwrap();
        writer.finalize().unwrap();

        let mut reader = Reader::new(Cursor::new(buf));
        reader.read_header().unwrap();
        let tx = reader.read_transactions().next().unwrap().unwrap();
        assert_eq!(tx.outputs[0].script_pub_key, p2pkh);
        assert_eq!(tx.outputs[0].vout, 3);
        assert_eq!(tx.outputs[0].height, 500_000);
        assert_eq!(tx.outputs[0].amount, 100_000_000);
    }
}
