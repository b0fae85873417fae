//! Raw script bytes.
//!
//! [`Script`] is an unparsed byte container used for locking scripts stored
//! in outputs and unlocking scripts carried by inputs. Decoding into
//! operations happens in the interpreter's parser, never here.

use std::fmt;

use crate::address::Address;
use crate::opcodes::*;
use crate::ScriptError;

#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Script(Vec<u8>);

impl Script {
    pub fn new() -> Self {
        Script(Vec::new())
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, ScriptError> {
        Ok(Script(hex::decode(hex_str)?))
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Script(bytes.to_vec())
    }

    /// Standard pay-to-public-key-hash locking script:
    /// `OP_DUP OP_HASH160 <pkh> OP_EQUALVERIFY OP_CHECKSIG`.
    pub fn p2pkh(address: &Address) -> Self {
        let mut bytes = Vec::with_capacity(25);
        bytes.extend_from_slice(&[OP_DUP, OP_HASH160, OP_DATA_20]);
        bytes.extend_from_slice(&address.public_key_hash);
        bytes.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
        Script(bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn to_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_p2pkh(&self) -> bool {
        let b = &self.0;
        b.len() == 25
            && b[0] == OP_DUP
            && b[1] == OP_HASH160
            && b[2] == OP_DATA_20
            && b[23] == OP_EQUALVERIFY
            && b[24] == OP_CHECKSIG
    }

    /// The 20-byte hash locked by a P2PKH script.
    pub fn public_key_hash(&self) -> Result<[u8; 20], ScriptError> {
        if !self.is_p2pkh() {
            return Err(ScriptError::NotP2PKH);
        }
        let mut out = [0u8; 20];
        out.copy_from_slice(&self.0[3..23]);
        Ok(out)
    }

    /// Append `data` with the smallest push prefix that can carry it.
    pub fn append_push_data(&mut self, data: &[u8]) -> Result<(), ScriptError> {
        let len = data.len();
        match len {
            0..=75 => self.0.push(len as u8),
            76..=0xff => self.0.extend_from_slice(&[OP_PUSHDATA1, len as u8]),
            0x100..=0xffff => {
                self.0.push(OP_PUSHDATA2);
                self.0.extend_from_slice(&(len as u16).to_le_bytes());
            }
            _ => {
                let len = u32::try_from(len).map_err(|_| ScriptError::DataTooBig)?;
                self.0.push(OP_PUSHDATA4);
                self.0.extend_from_slice(&len.to_le_bytes());
            }
        }
        self.0.extend_from_slice(data);
        Ok(())
    }

    /// Append bare opcodes. Push opcodes are rejected since they need data.
    pub fn append_opcodes(&mut self, opcodes: &[u8]) -> Result<(), ScriptError> {
        if let Some(&op) = opcodes
            .iter()
            .find(|&&op| (OP_DATA_1..=OP_PUSHDATA4).contains(&op))
        {
            return Err(ScriptError::InvalidOpcodeType(opcode_name(op)));
        }
        self.0.extend_from_slice(opcodes);
        Ok(())
    }
}

impl From<Vec<u8>> for Script {
    fn from(bytes: Vec<u8>) -> Self {
        Script(bytes)
    }
}

impl AsRef<[u8]> for Script {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", self.to_hex())
    }
}

impl serde::Serialize for Script {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Script {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Script::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
