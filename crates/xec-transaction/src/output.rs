//! Transaction output with a satoshi value and locking script.

use xec_primitives::util::{ByteReader, ByteWriter};
use xec_script::interpreter::PrevOutput;
use xec_script::Script;

use crate::TransactionError;

/// A single output in an eCash transaction.
///
/// # Wire format
///
/// | Field            | Size           |
/// |------------------|----------------|
/// | satoshis         | 8 bytes (LE)   |
/// | script length    | VarInt         |
/// | locking_script   | variable       |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionOutput {
    pub satoshis: u64,

    /// The conditions a spending input's unlocking script must satisfy.
    pub locking_script: Script,
}

impl TransactionOutput {
    pub fn new() -> Self {
        TransactionOutput {
            satoshis: 0,
            locking_script: Script::new(),
        }
    }

    /// Deserialize an output: 8-byte LE satoshis, then a varint-prefixed
    /// locking script.
    pub fn read_from(reader: &mut ByteReader<'_>) -> Result<Self, TransactionError> {
        let satoshis = reader.read_u64_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading satoshis: {}", e))
        })?;

        let script_len = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading script length: {}", e))
        })?;

        let script_bytes = reader.read_bytes(script_len.value() as usize).map_err(|e| {
            TransactionError::SerializationError(format!("reading locking script: {}", e))
        })?;

        Ok(TransactionOutput {
            satoshis,
            locking_script: Script::from_bytes(script_bytes),
        })
    }

    pub fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_u64_le(self.satoshis);
        writer.write_var_bytes(self.locking_script.to_bytes());
    }

    /// Wire-format bytes. Also the per-output serialization committed to
    /// by the signature digest.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::with_capacity(9 + self.locking_script.len());
        self.write_to(&mut writer);
        writer.into_bytes()
    }

    pub fn locking_script_hex(&self) -> String {
        self.locking_script.to_hex()
    }
}

impl Default for TransactionOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&TransactionOutput> for PrevOutput {
    fn from(output: &TransactionOutput) -> Self {
        PrevOutput {
            locking_script: output.locking_script.clone(),
            satoshis: output.satoshis,
        }
    }
}
