//! Hash functions used by script opcodes and transaction serialization.
//!
//! Every function returns a fixed-size array so callers can push the digest
//! straight onto the script stack or embed it in a preimage.

use ripemd::Ripemd160;
use sha1::Sha1;
use sha2::{Digest, Sha256};

/// Compute the SHA-1 digest of `data`.
///
/// Only reachable through `OP_SHA1`; nothing in the protocol layer relies on it.
pub fn sha1(data: &[u8]) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute the SHA-256 digest of `data`.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute SHA-256(SHA-256(data)).
///
/// Used for transaction ids, signature digests, `OP_HASH256`, and Base58Check
/// checksums.
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// Compute the RIPEMD-160 digest of `data`.
pub fn ripemd160(data: &[u8]) -> [u8; 20] {
    let mut hasher = Ripemd160::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute RIPEMD-160(SHA-256(data)), the public key hash behind P2PKH
/// addresses and `OP_HASH160`.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    ripemd160(&sha256(data))
}
