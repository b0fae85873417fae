//! Script templates for producing unlocking scripts.

pub mod p2pkh;

use xec_script::Script;

use crate::transaction::Transaction;
use crate::TransactionError;

/// A signing strategy that produces the unlocking script for one input.
pub trait UnlockingScriptTemplate {
    /// Produce an unlocking script for input `input_index` of `tx`.
    fn sign(&self, tx: &Transaction, input_index: u32) -> Result<Script, TransactionError>;

    /// Expected byte length of the unlocking script, before signing.
    fn estimate_length(&self, tx: &Transaction, input_index: u32) -> u32;
}
