//! Signature digest computation.
//!
//! eCash signs the BIP143-style digest introduced with the replay-protected
//! sighash: it commits to the value being spent and hashes the prevouts,
//! sequences and outputs separately. Every accepted sighash type must carry
//! `SIGHASH_FORKID`.

use xec_primitives::hash::sha256d;
use xec_primitives::util::{ByteWriter, VarInt};

use crate::transaction::Transaction;
use crate::TransactionError;

/// Sign all inputs and all outputs.
pub const SIGHASH_ALL: u32 = 0x01;

/// Sign all inputs but no outputs.
pub const SIGHASH_NONE: u32 = 0x02;

/// Sign all inputs and only the output at the signed input's index.
pub const SIGHASH_SINGLE: u32 = 0x03;

/// Only commit to the input being signed.
pub const SIGHASH_ANYONECANPAY: u32 = 0x80;

/// Replay-protection flag required on every eCash signature.
pub const SIGHASH_FORKID: u32 = 0x40;

/// The standard eCash sighash type: ALL | FORKID.
pub const SIGHASH_ALL_FORKID: u32 = SIGHASH_ALL | SIGHASH_FORKID;

/// Mask extracting the base type (ALL, NONE, SINGLE).
pub const SIGHASH_MASK: u32 = 0x1f;

/// Whether `sighash_type` names ALL, NONE or SINGLE once the FORKID and
/// ANYONECANPAY bits are removed.
pub fn is_defined_type(sighash_type: u32) -> bool {
    let base = sighash_type & !(SIGHASH_FORKID | SIGHASH_ANYONECANPAY);
    (SIGHASH_ALL..=SIGHASH_SINGLE).contains(&base)
}

/// Compute the digest a signature over input `input_index` commits to.
///
/// # Arguments
/// * `tx`                  - The spending transaction.
/// * `input_index`         - Index of the input being signed.
/// * `prev_output_script`  - Locking script of the output being spent.
/// * `sighash_type`        - Combined sighash flags, e.g. `SIGHASH_ALL_FORKID`.
/// * `satoshis`            - Value of the output being spent.
///
/// # Returns
/// The double-SHA256 of the preimage.
pub fn signature_hash(
    tx: &Transaction,
    input_index: usize,
    prev_output_script: &[u8],
    sighash_type: u32,
    satoshis: u64,
) -> Result<[u8; 32], TransactionError> {
    let preimage = calc_preimage(tx, input_index, prev_output_script, sighash_type, satoshis)?;
    Ok(sha256d(&preimage))
}

/// Build the digest preimage.
///
/// Layout:
/// 1. nVersion (4 bytes LE)
/// 2. hashPrevouts (32 bytes), zero under ANYONECANPAY
/// 3. hashSequence (32 bytes), zero under ANYONECANPAY, SINGLE or NONE
/// 4. outpoint (32 + 4 bytes)
/// 5. scriptCode (varint + script)
/// 6. value (8 bytes LE)
/// 7. nSequence (4 bytes LE)
/// 8. hashOutputs (32 bytes), one output under SINGLE, zero under NONE
/// 9. nLocktime (4 bytes LE)
/// 10. sighash type (4 bytes LE)
pub fn calc_preimage(
    tx: &Transaction,
    input_index: usize,
    prev_output_script: &[u8],
    sighash_type: u32,
    satoshis: u64,
) -> Result<Vec<u8>, TransactionError> {
    let input = tx.inputs.get(input_index).ok_or_else(|| {
        TransactionError::InvalidTransaction(format!(
            "input index {} out of range (tx has {} inputs)",
            input_index,
            tx.inputs.len()
        ))
    })?;

    let base_type = sighash_type & SIGHASH_MASK;
    let anyone_can_pay = sighash_type & SIGHASH_ANYONECANPAY != 0;

    let hash_prevouts = if anyone_can_pay {
        [0u8; 32]
    } else {
        prevouts_hash(tx)
    };

    let hash_sequence =
        if anyone_can_pay || base_type == SIGHASH_SINGLE || base_type == SIGHASH_NONE {
            [0u8; 32]
        } else {
            sequence_hash(tx)
        };

    let hash_outputs = match base_type {
        SIGHASH_SINGLE if input_index < tx.outputs.len() => outputs_hash(tx, Some(input_index)),
        SIGHASH_SINGLE | SIGHASH_NONE => [0u8; 32],
        _ => outputs_hash(tx, None),
    };

    let mut writer = ByteWriter::with_capacity(156 + prev_output_script.len());
    writer.write_u32_le(tx.version);
    writer.write_bytes(&hash_prevouts);
    writer.write_bytes(&hash_sequence);
    writer.write_bytes(&input.source_txid);
    writer.write_u32_le(input.source_tx_out_index);
    writer.write_varint(VarInt::from(prev_output_script.len()));
    writer.write_bytes(prev_output_script);
    writer.write_u64_le(satoshis);
    writer.write_u32_le(input.sequence_number);
    writer.write_bytes(&hash_outputs);
    writer.write_u32_le(tx.lock_time);
    writer.write_u32_le(sighash_type);

    Ok(writer.into_bytes())
}

fn prevouts_hash(tx: &Transaction) -> [u8; 32] {
    let mut writer = ByteWriter::with_capacity(tx.inputs.len() * 36);
    for input in &tx.inputs {
        writer.write_bytes(&input.source_txid);
        writer.write_u32_le(input.source_tx_out_index);
    }
    sha256d(&writer.into_bytes())
}

fn sequence_hash(tx: &Transaction) -> [u8; 32] {
    let mut writer = ByteWriter::with_capacity(tx.inputs.len() * 4);
    for input in &tx.inputs {
        writer.write_u32_le(input.sequence_number);
    }
    sha256d(&writer.into_bytes())
}

/// Hash all outputs, or only the one at `single`.
fn outputs_hash(tx: &Transaction, single: Option<usize>) -> [u8; 32] {
    let mut writer = ByteWriter::new();
    match single {
        Some(n) => tx.outputs[n].write_to(&mut writer),
        None => {
            for output in &tx.outputs {
                output.write_to(&mut writer);
            }
        }
    }
    sha256d(&writer.into_bytes())
}
