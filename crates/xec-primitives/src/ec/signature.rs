//! DER-encoded ECDSA signatures over secp256k1.
//!
//! Signing uses RFC6979 deterministic nonces and always yields a low-S
//! signature. Verification goes through `k256`, which rejects high-S values.

use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa;

use crate::ec::private_key::PrivateKey;
use crate::ec::public_key::PublicKey;
use crate::PrimitivesError;

const DER_SEQUENCE: u8 = 0x30;
const DER_INTEGER: u8 = 0x02;

/// An ECDSA signature held as its two 32-byte big-endian scalars.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    r: [u8; 32],
    s: [u8; 32],
}

impl Signature {
    pub fn new(r: [u8; 32], s: [u8; 32]) -> Self {
        Signature { r, s }
    }

    pub fn r(&self) -> &[u8; 32] {
        &self.r
    }

    pub fn s(&self) -> &[u8; 32] {
        &self.s
    }

    /// Decode a DER signature (`30 len 02 rlen R 02 slen S`).
    ///
    /// The input must not carry the trailing sighash byte. Trailing garbage
    /// after the declared sequence length is rejected.
    pub fn from_der(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        if bytes.len() < 8 {
            return Err(malformed("too short"));
        }
        if bytes[0] != DER_SEQUENCE {
            return Err(malformed("no sequence marker"));
        }
        if bytes[1] as usize + 2 != bytes.len() {
            return Err(malformed("sequence length mismatch"));
        }

        let (r_bytes, rest) = read_der_integer(&bytes[2..], "R")?;
        let (s_bytes, rest) = read_der_integer(rest, "S")?;
        if !rest.is_empty() {
            return Err(malformed("trailing bytes after S"));
        }

        let r = to_scalar_bytes(r_bytes)?;
        let s = to_scalar_bytes(s_bytes)?;
        if r.iter().all(|&b| b == 0) || s.iter().all(|&b| b == 0) {
            return Err(malformed("zero scalar"));
        }

        Ok(Signature { r, s })
    }

    /// Encode as minimal DER.
    pub fn to_der(&self) -> Vec<u8> {
        let rb = der_integer_body(&self.r);
        let sb = der_integer_body(&self.s);

        let mut out = Vec::with_capacity(6 + rb.len() + sb.len());
        out.push(DER_SEQUENCE);
        out.push((4 + rb.len() + sb.len()) as u8);
        out.push(DER_INTEGER);
        out.push(rb.len() as u8);
        out.extend_from_slice(&rb);
        out.push(DER_INTEGER);
        out.push(sb.len() as u8);
        out.extend_from_slice(&sb);
        out
    }

    /// Sign a 32-byte digest, normalizing to low-S.
    pub fn sign(digest: &[u8; 32], priv_key: &PrivateKey) -> Result<Self, PrimitivesError> {
        let (sig, _) = priv_key
            .signing_key()
            .sign_prehash_recoverable(digest)
            .map_err(|e| PrimitivesError::InvalidSignature(e.to_string()))?;
        let sig = sig.normalize_s().unwrap_or(sig);

        let (r, s) = sig.split_bytes();
        Ok(Signature {
            r: r.into(),
            s: s.into(),
        })
    }

    /// Verify against a 32-byte digest. Any decoding failure counts as an
    /// invalid signature.
    pub fn verify(&self, digest: &[u8; 32], pub_key: &PublicKey) -> bool {
        let sig = match ecdsa::Signature::from_scalars(
            k256::FieldBytes::from(self.r),
            k256::FieldBytes::from(self.s),
        ) {
            Ok(sig) => sig,
            Err(_) => return false,
        };
        pub_key.verifying_key().verify_prehash(digest, &sig).is_ok()
    }
}

fn malformed(reason: &str) -> PrimitivesError {
    PrimitivesError::InvalidSignature(format!("malformed signature: {}", reason))
}

/// Split one `02 len body` element off the front of `data`.
fn read_der_integer<'a>(
    data: &'a [u8],
    name: &str,
) -> Result<(&'a [u8], &'a [u8]), PrimitivesError> {
    if data.len() < 2 || data[0] != DER_INTEGER {
        return Err(malformed(&format!("missing integer marker for {}", name)));
    }
    let len = data[1] as usize;
    if len == 0 || data.len() < 2 + len {
        return Err(malformed(&format!("bogus {} length", name)));
    }
    if data[2] & 0x80 != 0 {
        return Err(malformed(&format!("negative {}", name)));
    }
    Ok((&data[2..2 + len], &data[2 + len..]))
}

fn to_scalar_bytes(bytes: &[u8]) -> Result<[u8; 32], PrimitivesError> {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    let trimmed = &bytes[start..];
    if trimmed.len() > 32 {
        return Err(malformed("integer wider than 32 bytes"));
    }
    let mut out = [0u8; 32];
    out[32 - trimmed.len()..].copy_from_slice(trimmed);
    Ok(out)
}

fn der_integer_body(val: &[u8; 32]) -> Vec<u8> {
    let start = val.iter().position(|&b| b != 0).unwrap_or(31);
    let trimmed = &val[start..];
    let mut out = Vec::with_capacity(33);
    if trimmed[0] & 0x80 != 0 {
        out.push(0x00);
    }
    out.extend_from_slice(trimmed);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::sha256;

    const VALID_DER: &str = "304402204e45e16932b8af514961a1d3a1a25fdf3f4f7732e9d624c6c61548ab5fb8cd41\
                             0220181522ec8eca07de4860a4acdd12909d831cc56cbbac4622082221a8768d1d09";

    fn hex_to_32(s: &str) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&hex::decode(s).unwrap());
        out
    }

    #[test]
    fn test_der_parsing() {
        let valid = hex::decode(VALID_DER).unwrap();
        let sig = Signature::from_der(&valid).unwrap();
        assert_eq!(
            sig.r(),
            &hex_to_32("4e45e16932b8af514961a1d3a1a25fdf3f4f7732e9d624c6c61548ab5fb8cd41")
        );
        assert_eq!(sig.to_der(), valid);

        assert!(Signature::from_der(&[]).is_err());

        let mut bad_magic = valid.clone();
        bad_magic[0] = 0x31;
        assert!(Signature::from_der(&bad_magic).is_err());

        let mut bad_marker = valid.clone();
        bad_marker[2] = 0x03;
        assert!(Signature::from_der(&bad_marker).is_err());

        // A trailing sighash byte must be stripped by the caller.
        let mut with_hashtype = valid.clone();
        with_hashtype.push(0x41);
        assert!(Signature::from_der(&with_hashtype).is_err());
    }

    #[test]
    fn test_der_encoding_pads_high_bit() {
        let sig = Signature::new(
            hex_to_32("a196ed0e7ebcbe7b63fe1d8eecbdbde03a67ceba4fc8f6482bdcb9606a911404"),
            hex_to_32("68e8d638056bb4b9a4cadaf39a8f5d0b9fe32b9b9b7749dc145f2db01d826190"),
        );
        let expected = hex::decode(
            "3045022100a196ed0e7ebcbe7b63fe1d8eecbdbde03a67ceba4fc8f6482bdcb9606a911404\
             022068e8d638056bb4b9a4cadaf39a8f5d0b9fe32b9b9b7749dc145f2db01d826190",
        )
        .unwrap();
        assert_eq!(sig.to_der(), expected);
        assert_eq!(Signature::from_der(&expected).unwrap(), sig);
    }

    #[test]
    fn test_sign_and_verify() {
        let key = PrivateKey::from_bytes(&[0x11; 32]).unwrap();
        let digest = sha256(b"spend output 0");
        let sig = Signature::sign(&digest, &key).unwrap();

        // low-S: the top bit of S is clear
        assert!(sig.s()[0] < 0x80);
        assert!(sig.verify(&digest, &key.pub_key()));

        let other = sha256(b"spend output 1");
        assert!(!sig.verify(&other, &key.pub_key()));

        let stranger = PrivateKey::from_bytes(&[0x22; 32]).unwrap();
        assert!(!sig.verify(&digest, &stranger.pub_key()));
    }

    #[test]
    fn test_signing_is_deterministic() {
        let key = PrivateKey::from_bytes(&[0x42; 32]).unwrap();
        let digest = sha256(b"rfc6979");
        let a = Signature::sign(&digest, &key).unwrap();
        let b = Signature::sign(&digest, &key).unwrap();
        assert_eq!(a, b);
    }
}
