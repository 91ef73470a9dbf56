//! Compressed `scriptPubKey` codec (spec.md §4.4).
//!
//! Bidirectional mapping between a full locking script and a tag byte
//! plus payload. The decode direction (tag → script) is grounded on the
//! teacher's `deserialize_script`; the encode direction (script → tag)
//! is this crate's own, matching the same five shapes structurally
//! before falling back to a length-tagged raw encoding.

use std::io::{self, Read, Write};

use crate::constants::COMPACT_SIZE_LIMIT;
use crate::ec;
use crate::error::{Result, SnapshotError};
use crate::varint::{read_varint, write_varint};

const OP_DUP: u8 = 0x76;
const OP_HASH160: u8 = 0xa9;
const OP_EQUALVERIFY: u8 = 0x88;
const OP_EQUAL: u8 = 0x87;
const OP_CHECKSIG: u8 = 0xac;

const TAG_P2PKH: u64 = 0;
const TAG_P2SH: u64 = 1;
const TAG_P2PK_COMPRESSED_EVEN: u64 = 2;
const TAG_P2PK_COMPRESSED_ODD: u64 = 3;
const TAG_P2PK_UNCOMPRESSED_EVEN: u64 = 4;
const TAG_P2PK_UNCOMPRESSED_ODD: u64 = 5;
const RAW_TAG_BASE: u64 = 6;

/// Decode a compressed script from `reader`, returning the full,
/// uncompressed `scriptPubKey` bytes.
///
/// For the uncompressed-P2PK tags (0x04/0x05), the x/y coordinates in
/// the reconstructed script are always canonical fixed-width 32-byte
/// big-endian: if the original script embedded non-canonical padding,
/// this will not reproduce it byte-for-byte (spec.md §4.4 Open
/// Question — the reference format doesn't handle this, so neither do
/// we).
pub fn decode<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let tag = read_varint(reader)?;

    match tag {
        TAG_P2PKH => {
            let hash = read_exact_20(reader)?;
            let mut script = Vec::with_capacity(25);
            script.push(OP_DUP);
            script.push(OP_HASH160);
            script.push(20);
            script.extend_from_slice(&hash);
            script.push(OP_EQUALVERIFY);
            script.push(OP_CHECKSIG);
            Ok(script)
        }
        TAG_P2SH => {
            let hash = read_exact_20(reader)?;
            let mut script = Vec::with_capacity(23);
            script.push(OP_HASH160);
            script.push(20);
            script.extend_from_slice(&hash);
            script.push(OP_EQUAL);
            Ok(script)
        }
        TAG_P2PK_COMPRESSED_EVEN | TAG_P2PK_COMPRESSED_ODD => {
            let x = read_exact_32(reader)?;
            let prefix = if tag == TAG_P2PK_COMPRESSED_EVEN { 0x02 } else { 0x03 };
            let mut script = Vec::with_capacity(35);
            script.push(0x21);
            script.push(prefix);
            script.extend_from_slice(&x);
            script.push(OP_CHECKSIG);
            Ok(script)
        }
        TAG_P2PK_UNCOMPRESSED_EVEN | TAG_P2PK_UNCOMPRESSED_ODD => {
            let x = read_exact_32(reader)?;
            let even_y = tag == TAG_P2PK_UNCOMPRESSED_EVEN;
            let uncompressed = ec::decompress(&x, even_y)?;
            let mut script = Vec::with_capacity(67);
            script.push(0x41);
            script.extend_from_slice(&uncompressed);
            script.push(OP_CHECKSIG);
            Ok(script)
        }
        raw_tag if raw_tag >= RAW_TAG_BASE => {
            let len = raw_tag - RAW_TAG_BASE;
            if len > COMPACT_SIZE_LIMIT {
                return Err(SnapshotError::format("raw script exceeds 32 MiB limit"));
            }
            let mut script = vec![0u8; len as usize];
            reader.read_exact(&mut script)?;
            Ok(script)
        }
        _ => unreachable!("every u64 is either a known tag or >= RAW_TAG_BASE"),
    }
}

/// Encode `script` into its compressed tag + payload form, matching the
/// four recognized shapes structurally before falling back to a raw
/// length-tagged encoding.
pub fn encode<W: Write>(writer: &mut W, script: &[u8]) -> Result<()> {
    if let Some(hash) = match_p2pkh(script) {
        write_varint(writer, TAG_P2PKH)?;
        writer.write_all(hash)?;
    } else if let Some(hash) = match_p2sh(script) {
        write_varint(writer, TAG_P2SH)?;
        writer.write_all(hash)?;
    } else if let Some(x) = match_p2pk_compressed(script) {
        let even_y = script[1] == 0x02;
        write_varint(
            writer,
            if even_y {
                TAG_P2PK_COMPRESSED_EVEN
            } else {
                TAG_P2PK_COMPRESSED_ODD
            },
        )?;
        writer.write_all(x)?;
    } else if let Some((x, even_y)) = match_p2pk_uncompressed(script)? {
        write_varint(
            writer,
            if even_y {
                TAG_P2PK_UNCOMPRESSED_EVEN
            } else {
                TAG_P2PK_UNCOMPRESSED_ODD
            },
        )?;
        writer.write_all(x)?;
    } else {
        let len = script.len() as u64;
        let tag = RAW_TAG_BASE
            .checked_add(len)
            .filter(|&t| t <= COMPACT_SIZE_LIMIT + RAW_TAG_BASE)
            .ok_or_else(|| SnapshotError::format("raw script exceeds 32 MiB limit"))?;
        write_varint(writer, tag)?;
        writer.write_all(script)?;
    }
    Ok(())
}

fn match_p2pkh(script: &[u8]) -> Option<&[u8]> {
    if script.len() == 25
        && script[0] == OP_DUP
        && script[1] == OP_HASH160
        && script[2] == 20
        && script[23] == OP_EQUALVERIFY
        && script[24] == OP_CHECKSIG
    {
        Some(&script[3..23])
    } else {
        None
    }
}

fn match_p2sh(script: &[u8]) -> Option<&[u8]> {
    if script.len() == 23 && script[0] == OP_HASH160 && script[1] == 20 && script[22] == OP_EQUAL
    {
        Some(&script[2..22])
    } else {
        None
    }
}

fn match_p2pk_compressed(script: &[u8]) -> Option<&[u8]> {
    if script.len() == 35
        && script[0] == 0x21
        && (script[1] == 0x02 || script[1] == 0x03)
        && script[34] == OP_CHECKSIG
    {
        Some(&script[2..34])
    } else {
        None
    }
}

/// Returns `(x, even_y)` when `script` is a full uncompressed P2PK
/// script, re-deriving the parity from `y` and validating the point is
/// still on the curve (so a corrupted `y` falls through to the raw
/// encoding rather than compressing to a script that won't decode back).
fn match_p2pk_uncompressed(script: &[u8]) -> Result<Option<(&[u8], bool)>> {
    if script.len() == 67 && script[0] == 0x41 && script[1] == 0x04 && script[66] == OP_CHECKSIG {
        let x = &script[2..34];
        let y = &script[34..66];
        let even_y = y[31] % 2 == 0;

        let mut x_arr = [0u8; 32];
        x_arr.copy_from_slice(x);
        if ec::decompress(&x_arr, even_y).is_err() {
            return Ok(None);
        }
        Ok(Some((x, even_y)))
    } else {
        Ok(None)
    }
}

fn read_exact_20<R: Read>(reader: &mut R) -> io::Result<[u8; 20]> {
    let mut buf = [0u8; 20];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

fn read_exact_32<R: Read>(reader: &mut R) -> io::Result<[u8; 32]> {
    let mut buf = [0u8; 32];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}
