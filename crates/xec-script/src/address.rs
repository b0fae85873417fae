//! Legacy Base58Check P2PKH addresses.
//!
//! Two derivations feed the same encoding: a hash-based address wraps a
//! 20-byte public key hash as-is, while a key-based address first hashes the
//! raw public key bytes with Hash160.

use std::fmt;

use serde::{Deserialize, Serialize};
use xec_primitives::hash::{hash160, sha256d};

use crate::ScriptError;

const MAINNET_P2PKH: u8 = 0x00;
const TESTNET_P2PKH: u8 = 0x6f;

/// Network selecting the address version byte.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
}

impl Network {
    fn version_byte(self) -> u8 {
        match self {
            Network::Mainnet => MAINNET_P2PKH,
            Network::Testnet => TESTNET_P2PKH,
        }
    }
}

/// A decoded P2PKH address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Address {
    pub address_string: String,
    pub public_key_hash: [u8; 20],
    pub network: Network,
}

impl Address {
    /// Decode and checksum-verify a Base58Check address string.
    pub fn from_string(addr: &str) -> Result<Self, ScriptError> {
        let decoded = bs58::decode(addr)
            .into_vec()
            .map_err(|e| ScriptError::InvalidAddress(format!("{}: {}", addr, e)))?;

        if decoded.len() != 25 {
            return Err(ScriptError::InvalidAddress(format!(
                "{}: decoded length {} is not 25",
                addr,
                decoded.len()
            )));
        }

        let checksum = sha256d(&decoded[..21]);
        if decoded[21..] != checksum[..4] {
            return Err(ScriptError::ChecksumFailed);
        }

        let network = match decoded[0] {
            MAINNET_P2PKH => Network::Mainnet,
            TESTNET_P2PKH => Network::Testnet,
            v => return Err(ScriptError::UnsupportedAddress(v)),
        };

        let mut public_key_hash = [0u8; 20];
        public_key_hash.copy_from_slice(&decoded[1..21]);

        Ok(Address {
            address_string: addr.to_string(),
            public_key_hash,
            network,
        })
    }

    /// Hash-based address: encode a 20-byte key hash directly.
    pub fn from_public_key_hash(hash: &[u8; 20], network: Network) -> Self {
        let mut payload = Vec::with_capacity(25);
        payload.push(network.version_byte());
        payload.extend_from_slice(hash);
        let checksum = sha256d(&payload);
        payload.extend_from_slice(&checksum[..4]);

        Address {
            address_string: bs58::encode(&payload).into_string(),
            public_key_hash: *hash,
            network,
        }
    }

    /// Key-based address: Hash160 the raw key bytes exactly as given, so a
    /// 65-byte uncompressed key and its 33-byte form yield different
    /// addresses.
    pub fn from_public_key_bytes(pub_key: &[u8], network: Network) -> Self {
        Self::from_public_key_hash(&hash160(pub_key), network)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address_string)
    }
}
