//! Transaction input referencing a previous output.
//!
//! Holds the spent outpoint, the unlocking script, the sequence number,
//! and optionally the previous output itself so the input can be signed
//! without an external lookup table.

use xec_primitives::util::{ByteReader, ByteWriter};
use xec_script::interpreter::{OutPoint, PrevOutput};
use xec_script::Script;

use crate::output::TransactionOutput;
use crate::TransactionError;

/// Default sequence number indicating a finalized input.
pub const DEFAULT_SEQUENCE_NUMBER: u32 = 0xFFFF_FFFF;

/// A single input in an eCash transaction.
///
/// # Wire format
///
/// | Field              | Size             |
/// |--------------------|------------------|
/// | source_txid        | 32 bytes (LE)    |
/// | source_tx_out_index| 4 bytes (LE)     |
/// | script length      | VarInt           |
/// | unlocking_script   | variable         |
/// | sequence_number    | 4 bytes (LE)     |
#[derive(Clone, Debug)]
pub struct TransactionInput {
    /// Id of the transaction holding the spent output, in internal
    /// (little-endian) byte order.
    pub source_txid: [u8; 32],

    /// Index of the spent output within the source transaction.
    pub source_tx_out_index: u32,

    pub sequence_number: u32,

    /// `None` while the input is unsigned.
    pub unlocking_script: Option<Script>,

    /// The output being spent, when known. Used for signing and as a
    /// fallback source for [`Transaction::source_outputs`](crate::Transaction::source_outputs).
    source_output: Option<TransactionOutput>,
}

impl TransactionInput {
    /// An unsigned input spending output 0 of the all-zero txid.
    pub fn new() -> Self {
        TransactionInput {
            source_txid: [0u8; 32],
            source_tx_out_index: 0,
            sequence_number: DEFAULT_SEQUENCE_NUMBER,
            unlocking_script: None,
            source_output: None,
        }
    }

    /// Deserialize an input from its wire format.
    ///
    /// # Arguments
    /// * `reader` - The reader positioned at the start of an encoded input.
    ///
    /// # Returns
    /// `Ok(TransactionInput)` on success, or a `TransactionError` if the
    /// data is truncated.
    pub fn read_from(reader: &mut ByteReader<'_>) -> Result<Self, TransactionError> {
        let source_txid = reader.read_array::<32>().map_err(|e| {
            TransactionError::SerializationError(format!("reading source txid: {}", e))
        })?;

        let source_tx_out_index = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading output index: {}", e))
        })?;

        let script_len = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading script length: {}", e))
        })?;

        let script_bytes = reader.read_bytes(script_len.value() as usize).map_err(|e| {
            TransactionError::SerializationError(format!("reading unlocking script: {}", e))
        })?;

        let sequence_number = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading sequence number: {}", e))
        })?;

        let unlocking_script = if script_bytes.is_empty() {
            None
        } else {
            Some(Script::from_bytes(script_bytes))
        };

        Ok(TransactionInput {
            source_txid,
            source_tx_out_index,
            sequence_number,
            unlocking_script,
            source_output: None,
        })
    }

    pub fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_bytes(&self.source_txid);
        writer.write_u32_le(self.source_tx_out_index);
        writer.write_var_bytes(self.unlocking_script_bytes());
        writer.write_u32_le(self.sequence_number);
    }

    /// The unlocking script bytes; empty while unsigned.
    pub fn unlocking_script_bytes(&self) -> &[u8] {
        self.unlocking_script
            .as_ref()
            .map(Script::to_bytes)
            .unwrap_or(&[])
    }

    /// The outpoint this input spends.
    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.source_txid, self.source_tx_out_index)
    }

    /// Attach (or clear) the output being spent.
    pub fn set_source_output(&mut self, output: Option<TransactionOutput>) {
        self.source_output = output;
    }

    pub fn source_tx_output(&self) -> Option<&TransactionOutput> {
        self.source_output.as_ref()
    }

    pub fn source_tx_satoshis(&self) -> Option<u64> {
        self.source_tx_output().map(|o| o.satoshis)
    }

    pub fn source_tx_script(&self) -> Option<&Script> {
        self.source_tx_output().map(|o| &o.locking_script)
    }

    /// The attached source output as a lookup-table entry.
    pub fn prev_output(&self) -> Option<PrevOutput> {
        self.source_tx_output().map(PrevOutput::from)
    }
}

impl Default for TransactionInput {
    fn default() -> Self {
        Self::new()
    }
}
