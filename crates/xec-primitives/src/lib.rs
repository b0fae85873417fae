//! eCash cryptographic primitives, hashing, and wire utilities.
//!
//! This crate provides the foundational building blocks shared by the
//! script interpreter and the transaction model:
//! - Hash functions (SHA-1, SHA-256, SHA-256d, RIPEMD-160, Hash160)
//! - secp256k1 keys and DER-encoded ECDSA signatures
//! - Little-endian byte reader/writer and VarInt encoding

pub mod ec;
pub mod hash;
pub mod util;

mod error;
pub use error::PrimitivesError;
