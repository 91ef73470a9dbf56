//! Network identification from the header's 4-byte magic (spec.md §3/§6).

use crate::constants::{
    MAINNET_MAGIC, REGTEST_MAGIC, SIGNET_MAGIC, TESTNET3_MAGIC, TESTNET4_MAGIC,
};

/// Which Bitcoin network a snapshot's block hash belongs to.
///
/// `Unknown` covers any magic outside the five recognized ones; the raw
/// 4 bytes are preserved separately on [`crate::model::Header::network_magic`]
/// so an unrecognized magic still round-trips exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
    Mainnet,
    Testnet3,
    Testnet4,
    Signet,
    Regtest,
    Unknown,
}

impl Network {
    /// Resolve a 4-byte network magic to its tagged variant.
    pub fn from_magic(magic: [u8; 4]) -> Network {
        match magic {
            MAINNET_MAGIC => Network::Mainnet,
            TESTNET3_MAGIC => Network::Testnet3,
            TESTNET4_MAGIC => Network::Testnet4,
            SIGNET_MAGIC => Network::Signet,
            REGTEST_MAGIC => Network::Regtest,
            _ => Network::Unknown,
        }
    }

    /// The canonical magic for this network, if it has one.
    ///
    /// Returns `None` for `Unknown`, since an unknown network carries no
    /// single canonical magic — callers writing an `Unknown` header must
    /// supply `Header::network_magic` directly.
    pub fn magic(self) -> Option<[u8; 4]> {
        match self {
            Network::Mainnet => Some(MAINNET_MAGIC),
            Network::Testnet3 => Some(TESTNET3_MAGIC),
            Network::Testnet4 => Some(TESTNET4_MAGIC),
            Network::Signet => Some(SIGNET_MAGIC),
            Network::Regtest => Some(REGTEST_MAGIC),
            Network::Unknown => None,
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Network::Mainnet => "mainnet",
            Network::Testnet3 => "testnet3",
            Network::Testnet4 => "testnet4",
            Network::Signet => "signet",
            Network::Regtest => "regtest",
            Network::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_magics() {
        assert_eq!(Network::from_magic(MAINNET_MAGIC), Network::Mainnet);
        assert_eq!(Network::from_magic(REGTEST_MAGIC), Network::Regtest);
        assert_eq!(Network::from_magic(SIGNET_MAGIC), Network::Signet);
        assert_eq!(Network::from_magic(TESTNET3_MAGIC), Network::Testnet3);
        assert_eq!(Network::from_magic(TESTNET4_MAGIC), Network::Testnet4);
    }

    #[test]
    fn unrecognized_magic_is_unknown() {
        assert_eq!(Network::from_magic([0, 1, 2, 3]), Network::Unknown);
    }

    #[test]
    fn magic_roundtrips_for_known_networks() {
        for network in [
            Network::Mainnet,
            Network::Testnet3,
            Network::Testnet4,
            Network::Signet,
            Network::Regtest,
        ] {
            let magic = network.magic().expect("known network has a magic");
            assert_eq!(Network::from_magic(magic), network);
        }
        assert_eq!(Network::Unknown.magic(), None);
    }
}
