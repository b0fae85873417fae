//! Pay-to-Public-Key-Hash (P2PKH) template.
//!
//! Locking script: `OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG`.
//! Unlocking script: `<sig || sighash byte> <compressed pubkey>`.

use xec_primitives::ec::PrivateKey;
use xec_script::{Address, Script};

use crate::sighash::SIGHASH_ALL_FORKID;
use crate::template::UnlockingScriptTemplate;
use crate::transaction::Transaction;
use crate::TransactionError;

/// The 25-byte P2PKH locking script paying to `address`.
pub fn lock(address: &Address) -> Script {
    Script::p2pkh(address)
}

/// Create a P2PKH unlocker. `sighash_flag` defaults to `SIGHASH_ALL_FORKID`.
pub fn unlock(private_key: PrivateKey, sighash_flag: Option<u32>) -> P2PKH {
    P2PKH {
        private_key,
        sighash_flag: sighash_flag.unwrap_or(SIGHASH_ALL_FORKID),
    }
}

pub struct P2PKH {
    private_key: PrivateKey,
    sighash_flag: u32,
}

impl UnlockingScriptTemplate for P2PKH {
    /// Sign the digest of input `input_index` with RFC6979 ECDSA.
    ///
    /// The input must carry its source output, since the digest commits
    /// to the spent script and value.
    fn sign(&self, tx: &Transaction, input_index: u32) -> Result<Script, TransactionError> {
        let idx = input_index as usize;

        let input = tx.inputs.get(idx).ok_or_else(|| {
            TransactionError::SigningError(format!(
                "input index {} out of range (tx has {} inputs)",
                idx,
                tx.inputs.len()
            ))
        })?;
        if input.source_tx_output().is_none() {
            return Err(TransactionError::SigningError(
                "missing source output on input (no previous tx info)".to_string(),
            ));
        }

        let sig_hash = tx.calc_input_signature_hash(idx, self.sighash_flag)?;
        let signature = self.private_key.sign(&sig_hash)?;
        let pub_key_bytes = self.private_key.pub_key().to_compressed();

        let mut sig_buf = signature.to_der();
        sig_buf.push(self.sighash_flag as u8);

        let mut script = Script::new();
        script.append_push_data(&sig_buf)?;
        script.append_push_data(&pub_key_bytes)?;

        Ok(script)
    }

    /// 1 + 72 (DER sig + sighash byte) + 1 + 33 (compressed pubkey), less
    /// one for the common 71-byte signature.
    fn estimate_length(&self, _tx: &Transaction, _input_index: u32) -> u32 {
        106
    }
}
