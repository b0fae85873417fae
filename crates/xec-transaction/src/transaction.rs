//! Core transaction type.
//!
//! Represents a complete transaction with version, inputs, outputs, and
//! lock time. Besides the wire codec and txid, a [`Transaction`] is the
//! [`TxContext`] the script engine consults when a signature-checking
//! opcode runs, and it can verify its own inputs against a table of
//! previous outputs.

use xec_primitives::hash::sha256d;
use xec_primitives::util::{ByteReader, ByteWriter, VarInt};
use xec_script::interpreter::{
    Config, EcdsaVerifier, InterpreterError, InterpreterErrorCode, OutPoint, PrevOutput,
    PrevOutputs, ScriptEngine, TxContext,
};
use xec_script::Script;

use crate::input::{TransactionInput, DEFAULT_SEQUENCE_NUMBER};
use crate::output::TransactionOutput;
use crate::sighash::{self, SIGHASH_FORKID};
use crate::TransactionError;

/// An eCash transaction.
///
/// # Wire format
///
/// | Field        | Size                      |
/// |--------------|---------------------------|
/// | version      | 4 bytes (LE)              |
/// | input count  | VarInt                    |
/// | inputs       | variable (per input)      |
/// | output count | VarInt                    |
/// | outputs      | variable (per output)     |
/// | lock_time    | 4 bytes (LE)              |
#[derive(Clone, Debug)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub lock_time: u32,
}

impl Transaction {
    /// Create an empty transaction with version 1 and lock time 0.
    pub fn new() -> Self {
        Transaction {
            version: 1,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
        }
    }

    // -----------------------------------------------------------------
    // Deserialization
    // -----------------------------------------------------------------

    pub fn from_hex(hex_str: &str) -> Result<Self, TransactionError> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| TransactionError::SerializationError(format!("invalid hex: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    /// Parse exactly one transaction; trailing bytes are an error.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut reader = ByteReader::new(bytes);
        let tx = Self::read_from(&mut reader)?;
        if !reader.is_exhausted() {
            return Err(TransactionError::SerializationError(format!(
                "trailing {} bytes after transaction",
                reader.remaining()
            )));
        }
        Ok(tx)
    }

    /// Deserialize a transaction from a reader positioned at its first byte.
    ///
    /// # Arguments
    /// * `reader` - The reader positioned at the start of a serialized transaction.
    ///
    /// # Returns
    /// `Ok(Transaction)` on success, or a `TransactionError` if any field
    /// is truncated.
    pub fn read_from(reader: &mut ByteReader<'_>) -> Result<Self, TransactionError> {
        let version = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading version: {}", e))
        })?;

        let input_count = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading input count: {}", e))
        })?;

        let mut inputs = Vec::with_capacity(bounded_capacity(input_count, reader));
        for _ in 0..input_count.value() {
            inputs.push(TransactionInput::read_from(reader)?);
        }

        let output_count = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading output count: {}", e))
        })?;

        let mut outputs = Vec::with_capacity(bounded_capacity(output_count, reader));
        for _ in 0..output_count.value() {
            outputs.push(TransactionOutput::read_from(reader)?);
        }

        let lock_time = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading lock time: {}", e))
        })?;

        Ok(Transaction {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }

    // -----------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::with_capacity(256);
        writer.write_u32_le(self.version);

        writer.write_varint(VarInt::from(self.inputs.len()));
        for input in &self.inputs {
            input.write_to(&mut writer);
        }

        writer.write_varint(VarInt::from(self.outputs.len()));
        for output in &self.outputs {
            output.write_to(&mut writer);
        }

        writer.write_u32_le(self.lock_time);
        writer.into_bytes()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn size(&self) -> usize {
        self.to_bytes().len()
    }

    // -----------------------------------------------------------------
    // Transaction ID
    // -----------------------------------------------------------------

    /// Double SHA-256 of the serialized transaction, in internal byte order.
    pub fn tx_id(&self) -> [u8; 32] {
        sha256d(&self.to_bytes())
    }

    /// The txid as conventionally displayed (byte-reversed hex).
    pub fn tx_id_hex(&self) -> String {
        let mut id = self.tx_id();
        id.reverse();
        hex::encode(id)
    }

    // -----------------------------------------------------------------
    // Inputs and outputs
    // -----------------------------------------------------------------

    pub fn add_input(&mut self, input: TransactionInput) {
        self.inputs.push(input);
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn add_output(&mut self, output: TransactionOutput) {
        self.outputs.push(output);
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    pub fn total_output_satoshis(&self) -> u64 {
        self.outputs.iter().map(|o| o.satoshis).sum()
    }

    /// A coinbase has a single input spending the all-zero txid with
    /// index or sequence `0xFFFFFFFF`.
    pub fn is_coinbase(&self) -> bool {
        match self.inputs.as_slice() {
            [input] => {
                input.source_txid == [0u8; 32]
                    && (input.source_tx_out_index == 0xFFFF_FFFF
                        || input.sequence_number == 0xFFFF_FFFF)
            }
            _ => false,
        }
    }

    /// Add an input spending `vout` of `prev_tx_id` and remember the
    /// spent output for signing.
    ///
    /// # Arguments
    /// * `prev_tx_id` - Hex txid of the previous transaction, in display order.
    /// * `vout` - Index of the spent output.
    /// * `prev_locking_script_hex` - Hex locking script of the spent output.
    /// * `satoshis` - Value of the spent output.
    ///
    /// # Returns
    /// `Ok(())` on success, or a `TransactionError` if any hex is invalid.
    pub fn add_input_from(
        &mut self,
        prev_tx_id: &str,
        vout: u32,
        prev_locking_script_hex: &str,
        satoshis: u64,
    ) -> Result<(), TransactionError> {
        let source_txid = txid_from_hex(prev_tx_id)?;
        let locking_script = if prev_locking_script_hex.is_empty() {
            Script::new()
        } else {
            Script::from_hex(prev_locking_script_hex)?
        };

        let mut input = TransactionInput::new();
        input.source_txid = source_txid;
        input.source_tx_out_index = vout;
        input.sequence_number = DEFAULT_SEQUENCE_NUMBER;
        input.set_source_output(Some(TransactionOutput {
            satoshis,
            locking_script,
        }));

        self.inputs.push(input);
        Ok(())
    }

    // -----------------------------------------------------------------
    // Previous-output tables
    // -----------------------------------------------------------------

    /// Index this transaction's outputs by outpoint, for verifying a
    /// transaction that spends them.
    pub fn index_outputs(&self) -> PrevOutputs {
        let txid = self.tx_id();
        self.outputs
            .iter()
            .enumerate()
            .map(|(vout, output)| (OutPoint::new(txid, vout as u32), PrevOutput::from(output)))
            .collect()
    }

    /// Collect the source outputs attached to this transaction's inputs.
    /// Inputs without one are skipped.
    pub fn source_outputs(&self) -> PrevOutputs {
        self.inputs
            .iter()
            .filter_map(|input| Some((input.outpoint(), input.prev_output()?)))
            .collect()
    }

    // -----------------------------------------------------------------
    // Signature hash
    // -----------------------------------------------------------------

    /// Digest for input `input_index` using the source output attached
    /// to that input.
    pub fn calc_input_signature_hash(
        &self,
        input_index: usize,
        sighash_flag: u32,
    ) -> Result<[u8; 32], TransactionError> {
        let input = self.input(input_index)?;
        let source_output = input.source_tx_output().ok_or_else(|| {
            TransactionError::SigningError(
                "missing source output on input (no previous tx info)".to_string(),
            )
        })?;

        sighash::signature_hash(
            self,
            input_index,
            source_output.locking_script.to_bytes(),
            sighash_flag,
            source_output.satoshis,
        )
    }

    // -----------------------------------------------------------------
    // Verification
    // -----------------------------------------------------------------

    /// Check whether input `input_index` may spend the output it names,
    /// with the default (unbounded) limits.
    ///
    /// # Returns
    /// `Ok(true)` if the scripts validate or the transaction is a coinbase,
    /// `Ok(false)` if they decode but reject, or an error if the input is
    /// missing, its previous output is not in `prev_outputs`, or either
    /// script cannot be decoded.
    pub fn verify_input(
        &self,
        input_index: usize,
        prev_outputs: &PrevOutputs,
    ) -> Result<bool, TransactionError> {
        self.verify_input_with_config(input_index, prev_outputs, Config::default())
    }

    pub fn verify_input_with_config(
        &self,
        input_index: usize,
        prev_outputs: &PrevOutputs,
        config: Config,
    ) -> Result<bool, TransactionError> {
        let _span = tracing::debug_span!("verify_input", input_index).entered();

        let input = self.input(input_index)?;
        if self.is_coinbase() {
            tracing::debug!("coinbase input spends no previous output");
            return Ok(true);
        }
        let outpoint = input.outpoint();
        let prev = prev_outputs
            .get(&outpoint)
            .ok_or_else(|| TransactionError::MissingPrevOutput(describe(&outpoint)))?;

        let engine = ScriptEngine::parse_with_config(
            input.unlocking_script_bytes(),
            prev.locking_script.to_bytes(),
            config,
        )?;

        match engine.verify(self, input_index, prev_outputs, &EcdsaVerifier) {
            Ok(()) => {
                tracing::debug!(address = engine.address(), "input verified");
                Ok(true)
            }
            Err(e) => {
                tracing::debug!(code = %e.code, "input rejected: {}", e.description);
                Ok(false)
            }
        }
    }

    /// Verify every input; stops at the first that does not validate.
    pub fn verify_inputs(&self, prev_outputs: &PrevOutputs) -> Result<bool, TransactionError> {
        for input_index in 0..self.inputs.len() {
            if !self.verify_input(input_index, prev_outputs)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn input(&self, input_index: usize) -> Result<&TransactionInput, TransactionError> {
        self.inputs.get(input_index).ok_or_else(|| {
            TransactionError::InvalidTransaction(format!(
                "input index {} out of range (tx has {} inputs)",
                input_index,
                self.inputs.len()
            ))
        })
    }
}

impl TxContext for Transaction {
    fn outpoint(&self, input_idx: usize) -> Option<OutPoint> {
        self.inputs.get(input_idx).map(TransactionInput::outpoint)
    }

    fn signature_digest(
        &self,
        input_idx: usize,
        script_code: &Script,
        satoshis: u64,
        sighash_type: u32,
    ) -> Result<[u8; 32], InterpreterError> {
        if sighash_type & SIGHASH_FORKID == 0 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::IllegalForkId,
                format!("sighash type 0x{:02x} does not set the fork id bit", sighash_type),
            ));
        }
        if !sighash::is_defined_type(sighash_type) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidSigHashType,
                format!("undefined sighash type 0x{:02x}", sighash_type),
            ));
        }
        sighash::signature_hash(self, input_idx, script_code.to_bytes(), sighash_type, satoshis)
            .map_err(|e| InterpreterError::new(InterpreterErrorCode::InvalidIndex, e.to_string()))
    }

    fn lock_time(&self) -> u32 {
        self.lock_time
    }

    fn tx_version(&self) -> u32 {
        self.version
    }

    fn input_sequence(&self, input_idx: usize) -> Option<u32> {
        self.inputs.get(input_idx).map(|input| input.sequence_number)
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

/// Hex-encoded serialization.
impl std::fmt::Display for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Decode a display-order txid into internal byte order.
fn txid_from_hex(txid_hex: &str) -> Result<[u8; 32], TransactionError> {
    let bytes = hex::decode(txid_hex)
        .map_err(|e| TransactionError::SerializationError(format!("invalid txid hex: {}", e)))?;
    let mut txid: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
        TransactionError::SerializationError(format!("txid must be 32 bytes, got {}", bytes.len()))
    })?;
    txid.reverse();
    Ok(txid)
}

fn describe(outpoint: &OutPoint) -> String {
    let mut txid = outpoint.txid;
    txid.reverse();
    format!("{}:{}", hex::encode(txid), outpoint.vout)
}

/// Preallocation for `count` items, never more than the bytes left.
fn bounded_capacity(count: VarInt, reader: &ByteReader<'_>) -> usize {
    (count.value() as usize).min(reader.remaining())
}
