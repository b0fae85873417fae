#![deny(missing_docs)]

//! eCash SDK.
//!
//! Re-exports the workspace crates for single-crate usage, plus the types
//! needed to verify a transaction input in one import.

pub use xec_primitives as primitives;
pub use xec_script as script;
pub use xec_transaction as transaction;

pub use xec_script::interpreter::{Config, OutPoint, PrevOutput, PrevOutputs, ScriptEngine};
pub use xec_script::{Address, Network};
pub use xec_transaction::Transaction;
