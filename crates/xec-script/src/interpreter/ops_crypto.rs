//! Hashing and signature-checking operations.

use xec_primitives::hash;

use crate::Script;

use super::config::MAX_PUBKEYS_PER_MULTISIG;
use super::context::ScriptContext;
use super::error::{InterpreterError, InterpreterErrorCode};

pub(crate) enum HashType {
    Ripemd160,
    Sha1,
    Sha256,
    Hash160,
    Hash256,
}

impl<'a> ScriptContext<'a> {
    pub(crate) fn op_hash(&mut self, hash_type: HashType) -> Result<(), InterpreterError> {
        let buf = self.stack.pop()?;
        let digest = match hash_type {
            HashType::Ripemd160 => hash::ripemd160(&buf).to_vec(),
            HashType::Sha1 => hash::sha1(&buf).to_vec(),
            HashType::Sha256 => hash::sha256(&buf).to_vec(),
            HashType::Hash160 => hash::hash160(&buf).to_vec(),
            HashType::Hash256 => hash::sha256d(&buf).to_vec(),
        };
        self.stack.push(digest);
        Ok(())
    }

    /// Check one transaction signature. The last byte of `full_sig` is the
    /// sighash type; an empty signature is simply false. The digest covers
    /// the spent locking script from the last executed `OP_CODESEPARATOR`.
    fn check_tx_sig(&self, full_sig: &[u8], pub_key: &[u8]) -> Result<bool, InterpreterError> {
        let Some((&sighash_type, sig)) = full_sig.split_last() else {
            return Ok(false);
        };
        let prev = self.spent_output()?;
        let script_code = match self.script_code_start {
            0 => prev.locking_script.clone(),
            start => Script::from_bytes(
                prev.locking_script.to_bytes().get(start..).unwrap_or_default(),
            ),
        };
        let digest = self.tx().signature_digest(
            self.input_idx(),
            &script_code,
            prev.satoshis,
            sighash_type as u32,
        )?;
        Ok(self.verifier().verify(&digest, sig, pub_key))
    }

    fn check_null_fail<'s>(
        &self,
        mut sigs: impl Iterator<Item = &'s Vec<u8>>,
    ) -> Result<(), InterpreterError> {
        if self.config.require_null_fail && sigs.any(|sig| !sig.is_empty()) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NullFail,
                "signature not empty on failed check".to_string(),
            ));
        }
        Ok(())
    }

    /// `sig pubkey -- bool`
    pub(crate) fn op_checksig(&mut self) -> Result<(), InterpreterError> {
        let pub_key = self.stack.pop()?;
        let full_sig = self.stack.pop()?;

        let valid = self.check_tx_sig(&full_sig, &pub_key)?;
        if !valid {
            self.check_null_fail(std::iter::once(&full_sig))?;
        }
        self.stack.push_bool(valid);
        Ok(())
    }

    /// `sig message pubkey -- bool`; the signature covers `sha256(message)`
    /// and carries no sighash byte.
    pub(crate) fn op_checkdatasig(&mut self) -> Result<(), InterpreterError> {
        let pub_key = self.stack.pop()?;
        let message = self.stack.pop()?;
        let sig = self.stack.pop()?;

        let valid = !sig.is_empty()
            && self.verifier().verify(&hash::sha256(&message), &sig, &pub_key);
        if !valid {
            self.check_null_fail(std::iter::once(&sig))?;
        }
        self.stack.push_bool(valid);
        Ok(())
    }

    /// `dummy sig1..sigM M pk1..pkN N -- bool`
    ///
    /// Signatures must appear in the same order as the keys they match.
    /// Keys are consumed as they are tried, so a signature that matches no
    /// remaining key fails the whole check. The dummy element is popped but
    /// not inspected.
    pub(crate) fn op_checkmultisig(&mut self) -> Result<(), InterpreterError> {
        let num_keys = self.stack.pop_int()?.value();
        if num_keys < 0 || num_keys as usize > MAX_PUBKEYS_PER_MULTISIG {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidPubKeyCount,
                format!(
                    "number of pubkeys {} is outside 0..={}",
                    num_keys, MAX_PUBKEYS_PER_MULTISIG
                ),
            ));
        }
        let num_keys = num_keys as usize;

        self.num_ops += num_keys;
        if let Some(max) = self.config.max_ops {
            if self.num_ops > max {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::TooManyOperations,
                    format!("exceeded max operation limit of {}", max),
                ));
            }
        }

        // Popped top first, so both lists run from last pushed to first.
        let mut pub_keys = Vec::with_capacity(num_keys);
        for _ in 0..num_keys {
            pub_keys.push(self.stack.pop()?);
        }

        let num_sigs = self.stack.pop_int()?.value();
        if num_sigs < 0 || num_sigs as usize > num_keys {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidSignatureCount,
                format!("number of signatures {} is outside 0..={}", num_sigs, num_keys),
            ));
        }
        let num_sigs = num_sigs as usize;

        let mut sigs = Vec::with_capacity(num_sigs);
        for _ in 0..num_sigs {
            sigs.push(self.stack.pop()?);
        }

        self.stack.pop()?;

        let mut key_idx = 0;
        let mut sig_idx = 0;
        let mut success = true;
        while success && sig_idx < sigs.len() {
            if self.check_tx_sig(&sigs[sig_idx], &pub_keys[key_idx])? {
                sig_idx += 1;
            }
            key_idx += 1;
            if sigs.len() - sig_idx > pub_keys.len() - key_idx {
                success = false;
            }
        }

        if !success {
            self.check_null_fail(sigs.iter())?;
        }
        self.stack.push_bool(success);
        Ok(())
    }
}
