//! eCash script handling.
//!
//! Provides the raw [`Script`] container, opcode definitions, legacy
//! Base58Check addresses, and the [`interpreter`] that parses an
//! unlocking/locking script pair and decides whether it authorizes a spend.

pub mod address;
pub mod interpreter;
pub mod opcodes;
pub mod script;

mod error;
pub use address::{Address, Network};
pub use error::ScriptError;
pub use interpreter::ScriptEngine;
pub use script::Script;
