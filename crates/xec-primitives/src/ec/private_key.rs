//! secp256k1 private key with WIF import/export.

use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;

use crate::ec::public_key::PublicKey;
use crate::ec::signature::Signature;
use crate::hash::sha256d;
use crate::PrimitivesError;

const PRIVATE_KEY_BYTES_LEN: usize = 32;

const MAINNET_WIF_PREFIX: u8 = 0x80;

const COMPRESS_MAGIC: u8 = 0x01;

#[derive(Clone, Debug)]
pub struct PrivateKey {
    inner: SigningKey,
}

impl PrivateKey {
    /// Generate a random key from the OS entropy source.
    pub fn new() -> Self {
        PrivateKey {
            inner: SigningKey::random(&mut OsRng),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        if bytes.len() != PRIVATE_KEY_BYTES_LEN {
            return Err(PrimitivesError::InvalidPrivateKey(format!(
                "expected {} bytes, got {}",
                PRIVATE_KEY_BYTES_LEN,
                bytes.len()
            )));
        }
        let inner = SigningKey::from_slice(bytes)
            .map_err(|e| PrimitivesError::InvalidPrivateKey(e.to_string()))?;
        Ok(PrivateKey { inner })
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        if hex_str.is_empty() {
            return Err(PrimitivesError::InvalidPrivateKey(
                "private key hex is empty".to_string(),
            ));
        }
        Self::from_bytes(&hex::decode(hex_str)?)
    }

    /// Decode a Base58Check WIF string (compressed or uncompressed form).
    pub fn from_wif(wif: &str) -> Result<Self, PrimitivesError> {
        let decoded = bs58::decode(wif)
            .into_vec()
            .map_err(|e| PrimitivesError::InvalidWif(e.to_string()))?;

        // prefix + key [+ compress flag] + 4-byte checksum
        let payload_len = match decoded.len() {
            38 if decoded[33] == COMPRESS_MAGIC => 34,
            38 => {
                return Err(PrimitivesError::InvalidWif(
                    "invalid compression flag".to_string(),
                ))
            }
            37 => 33,
            n => return Err(PrimitivesError::InvalidWif(format!("invalid length {}", n))),
        };

        let checksum = sha256d(&decoded[..payload_len]);
        if checksum[..4] != decoded[payload_len..] {
            return Err(PrimitivesError::ChecksumMismatch);
        }
        Self::from_bytes(&decoded[1..1 + PRIVATE_KEY_BYTES_LEN])
    }

    /// Encode as a compressed mainnet WIF string.
    pub fn to_wif(&self) -> String {
        let mut payload = Vec::with_capacity(38);
        payload.push(MAINNET_WIF_PREFIX);
        payload.extend_from_slice(&self.to_bytes());
        payload.push(COMPRESS_MAGIC);
        let checksum = sha256d(&payload);
        payload.extend_from_slice(&checksum[..4]);
        bs58::encode(payload).into_string()
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.inner.to_bytes().into()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn pub_key(&self) -> PublicKey {
        PublicKey::from_k256_verifying_key(self.inner.verifying_key())
    }

    pub fn sign(&self, digest: &[u8; 32]) -> Result<Signature, PrimitivesError> {
        Signature::sign(digest, self)
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.inner
    }
}

impl Default for PrivateKey {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for PrivateKey {}
