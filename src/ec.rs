//! secp256k1 public-key (de)compression (spec.md §4.5).
//!
//! The curve math — reject `x >= p`, recover `y` via `y = rhs^((p+1)/4)
//! mod p`, verify `y^2 == rhs`, flip to `p - y` on parity mismatch — is
//! exactly what `secp256k1::PublicKey::from_slice` already does when
//! parsing a 33-byte compressed key; this module is a thin, spec-shaped
//! wrapper around that library call rather than a hand-rolled modular
//! exponentiation (spec.md §9 explicitly allows the former).

use secp256k1::PublicKey;

use crate::error::{Result, SnapshotError};

/// Recover the full 65-byte uncompressed key `0x04 || x || y` from an
/// x-coordinate and a parity bit.
///
/// `even_y` is `true` when the original tag indicated an even y (tags
/// 0x02/0x04 in spec.md §4.4's table), `false` for odd (0x03/0x05).
/// Fails with [`SnapshotError::Format`] if `x` isn't the x-coordinate of
/// a point on the curve.
pub fn decompress(x: &[u8; 32], even_y: bool) -> Result<[u8; 65]> {
    let mut compressed = [0u8; 33];
    compressed[0] = if even_y { 0x02 } else { 0x03 };
    compressed[1..].copy_from_slice(x);

    let key = PublicKey::from_slice(&compressed)
        .map_err(|_| SnapshotError::format("secp256k1 point not on curve"))?;

    Ok(key.serialize_uncompressed())
}

/// Compress a 65-byte uncompressed key `0x04 || x || y` into its 33-byte
/// `prefix || x` form, validating that the point lies on the curve.
pub fn compress(uncompressed: &[u8; 65]) -> Result<[u8; 33]> {
    let key = PublicKey::from_slice(uncompressed)
        .map_err(|_| SnapshotError::format("secp256k1 point not on curve"))?;
    Ok(key.serialize())
}
