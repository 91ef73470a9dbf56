//! Length-tagged CompactSize codec (spec.md §4.1).
//!
//! Independent from [`crate::varint`]: this is the simple length-prefix
//! framing used for counts and output indices, not the biased
//! continuation encoding. Carries no state of its own.

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::constants::COMPACT_SIZE_LIMIT;
use crate::error::{Result, SnapshotError};

/// Read a CompactSize, enforcing canonical (minimal-length) encoding and,
/// by default, the 32 MiB range limit spec.md §4.1 requires for every
/// length-like use of this codec.
pub fn read_compact_size<R: Read>(reader: &mut R, range_checked: bool) -> Result<u64> {
    let tag = reader.read_u8()?;

    let value = match tag {
        0..=252 => tag as u64,
        253 => {
            let v = reader.read_u16::<LittleEndian>()? as u64;
            if v < 253 {
                return Err(SnapshotError::format("non-canonical CompactSize"));
            }
            v
        }
        254 => {
            let v = reader.read_u32::<LittleEndian>()? as u64;
            if v < 0x1_0000 {
                return Err(SnapshotError::format("non-canonical CompactSize"));
            }
            v
        }
        255 => {
            let v = reader.read_u64::<LittleEndian>()?;
            if v < 0x1_0000_0000 {
                return Err(SnapshotError::format("non-canonical CompactSize"));
            }
            v
        }
    };

    if range_checked && value > COMPACT_SIZE_LIMIT {
        return Err(SnapshotError::format("CompactSize exceeds 32 MiB limit"));
    }

    Ok(value)
}

/// Write `value` using the smallest canonical CompactSize encoding.
pub fn write_compact_size<W: Write>(writer: &mut W, value: u64) -> io::Result<()> {
    if value < 253 {
        writer.write_u8(value as u8)
    } else if value <= u16::MAX as u64 {
        writer.write_u8(253)?;
        writer.write_u16::<LittleEndian>(value as u16)
    } else if value <= u32::MAX as u64 {
        writer.write_u8(254)?;
        writer.write_u32::<LittleEndian>(value as u32)
    } else {
        writer.write_u8(255)?;
        writer.write_u64::<LittleEndian>(value)
    }
}

/// Number of bytes `write_compact_size` would emit for `value`.
pub fn compact_size_len(value: u64) -> usize {
    if value < 253 {
        1
    } else if value <= u16::MAX as u64 {
        3
    } else if value <= u32::MAX as u64 {
        5
    } else {
        9
    }
}
