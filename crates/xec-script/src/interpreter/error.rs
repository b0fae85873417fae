//! Runtime failure codes reported while executing a parsed program.
//!
//! Every variant here means "this input does not validate". None of them
//! indicate malformed script bytes; those are [`ScriptError`](crate::ScriptError)s.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpreterErrorCode {
    /// Program finished with nothing on the stack.
    EmptyStack,
    /// Program finished with a false value on top of the stack.
    EvalFalse,
    EarlyReturn,
    ElementTooBig,
    TooManyOperations,
    StackOverflow,
    InvalidStackOperation,
    InvalidAltStackOperation,
    UnbalancedConditional,
    InvalidPubKeyCount,
    InvalidSignatureCount,
    NumberTooBig,
    MinimalData,
    DivideByZero,
    InvalidSplitRange,
    InvalidOperandSize,
    ImpossibleEncoding,
    InvalidNumberRange,
    Verify,
    EqualVerify,
    NumEqualVerify,
    CheckSigVerify,
    CheckMultiSigVerify,
    CheckDataSigVerify,
    NullFail,
    NegativeLockTime,
    /// Timelock operand not met by the transaction's lock time or sequence.
    UnsatisfiedLockTime,
    /// Sighash type without the fork id bit.
    IllegalForkId,
    InvalidSigHashType,
    /// The previous output spent by this input is not in the lookup table.
    MissingPrevOutput,
    InvalidIndex,
}

impl fmt::Display for InterpreterErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpreterError {
    pub code: InterpreterErrorCode,
    pub description: String,
}

impl InterpreterError {
    pub fn new(code: InterpreterErrorCode, description: String) -> Self {
        InterpreterError { code, description }
    }
}

impl fmt::Display for InterpreterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.description)
    }
}

impl std::error::Error for InterpreterError {}
