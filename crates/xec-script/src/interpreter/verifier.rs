//! Signature verification seam.
//!
//! Signature-checking opcodes compute a digest and then ask a
//! [`SignatureVerifier`] whether the signature matches. The default
//! [`EcdsaVerifier`] checks DER-encoded secp256k1 ECDSA signatures.

use xec_primitives::ec::{PublicKey, Signature};

pub trait SignatureVerifier: Send + Sync {
    /// `sig` is the bare signature, without any sighash byte. Any decoding
    /// failure must be reported as `false`.
    fn verify(&self, digest: &[u8; 32], sig: &[u8], pub_key: &[u8]) -> bool;
}

/// DER ECDSA over secp256k1. High-S signatures are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct EcdsaVerifier;

impl SignatureVerifier for EcdsaVerifier {
    fn verify(&self, digest: &[u8; 32], sig: &[u8], pub_key: &[u8]) -> bool {
        let Ok(pub_key) = PublicKey::from_bytes(pub_key) else {
            return false;
        };
        let Ok(sig) = Signature::from_der(sig) else {
            return false;
        };
        sig.verify(digest, &pub_key)
    }
}
