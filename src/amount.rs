//! Compressed-amount bijection (spec.md §4.3).
//!
//! Exploits trailing-zero structure in round satoshi amounts: `n = m *
//! 10^e` for the largest `e` in `[0, 9]`, then folds the remaining digit
//! `d` and quotient `q` into a single codeword.

/// Compress a satoshi amount into its VarInt codeword.
pub fn compress_amount(n: u64) -> u64 {
    if n == 0 {
        return 0;
    }

    let mut x = n;
    let mut e = 0u32;
    while x % 10 == 0 && e < 9 {
        x /= 10;
        e += 1;
    }

    if e < 9 {
        let d = x % 10;
        debug_assert!((1..=9).contains(&d));
        let q = x / 10;
        1 + (9 * q + (d - 1)) * 10 + e as u64
    } else {
        1 + (x - 1) * 10 + 9
    }
}

/// Decompress a codeword back into its satoshi amount.
///
/// Inverse of [`compress_amount`] on every `u64` input; the spec's
/// round-trip law 1 (spec.md §8) holds unconditionally.
pub fn decompress_amount(x: u64) -> u64 {
    if x == 0 {
        return 0;
    }

    let mut x = x - 1;
    let e = x % 10;
    x /= 10;

    let n = if e < 9 {
        let d = x % 9 + 1;
        x /= 9;
        x * 10 + d
    } else {
        x + 1
    };

    n * 10u64.pow(e as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_a_fixed_point() {
        assert_eq!(compress_amount(0), 0);
        assert_eq!(decompress_amount(0), 0);
    }

    #[test]
    fn bitcoin_reference_examples() {
        // https://github.com/bitcoin/bitcoin/blob/master/src/test/compress_tests.cpp
        assert_eq!(decompress_amount(0x0), 0);
        assert_eq!(decompress_amount(0x1), 1);
        assert_eq!(decompress_amount(0x7), 1_000_000);
        assert_eq!(decompress_amount(0x9), 100_000_000);
        assert_eq!(decompress_amount(0x32), 50 * 100_000_000);
        assert_eq!(decompress_amount(0x1406f40), 21_000_000 * 100_000_000);
    }

    #[test]
    fn scenario_3_one_hundred_million_satoshis() {
        assert_eq!(compress_amount(100_000_000), 6);
        assert_eq!(decompress_amount(6), 100_000_000);
    }

    #[test]
    fn boundary_values() {
        for n in [0u64, 1, 1_000_000_000, 21_000_000 * 100_000_000] {
            assert_eq!(decompress_amount(compress_amount(n)), n);
        }
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn roundtrip(n: u64) {
            prop_assert_eq!(decompress_amount(compress_amount(n)), n);
        }
    }
}
