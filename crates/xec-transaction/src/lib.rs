//! eCash transaction model.
//!
//! Provides the [`Transaction`] type with its wire codec, the FORKID
//! signature digest used by signature-checking opcodes, a P2PKH signing
//! template, and per-input verification through the script engine.

pub mod input;
pub mod output;
pub mod sighash;
pub mod template;
pub mod transaction;

mod error;
pub use error::TransactionError;
pub use input::TransactionInput;
pub use output::TransactionOutput;
pub use transaction::Transaction;
