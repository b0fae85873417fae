//! Parsed operations and the opcode registry.
//!
//! [`Op`] is a closed set: every byte the parser accepts maps to exactly one
//! variant, and [`Op::from_opcode`] is the only place that decides which
//! bytes are supported. Anything it does not know is a fatal parse error.

use std::fmt;

use crate::opcodes::*;

use super::context::ScriptContext;
use super::error::InterpreterError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// Direct push of 1 to 75 bytes; the selector byte is the length.
    Data(Vec<u8>),
    /// `OP_PUSHDATA1/2/4` followed by its payload.
    PushData { opcode: u8, data: Vec<u8> },
    /// `OP_0`, `OP_1NEGATE` and `OP_1`..`OP_16`.
    Number(i8),
    /// `OP_NOP` and the upgradable no-ops.
    Nop(u8),

    If,
    NotIf,
    Else,
    EndIf,
    Verify,
    Return,
    CheckLockTimeVerify,
    CheckSequenceVerify,
    CodeSeparator,

    ToAltStack,
    FromAltStack,
    Drop2,
    Dup2,
    Dup3,
    Over2,
    Rot2,
    Swap2,
    IfDup,
    Depth,
    Drop,
    Dup,
    Nip,
    Over,
    Pick,
    Roll,
    Rot,
    Swap,
    Tuck,

    Cat,
    Split,
    Num2Bin,
    Bin2Num,
    Size,
    ReverseBytes,

    And,
    Or,
    Xor,
    Equal,
    EqualVerify,

    Add1,
    Sub1,
    Negate,
    Abs,
    Not,
    NotEqual0,
    Add,
    Sub,
    Div,
    Mod,
    BoolAnd,
    BoolOr,
    NumEqual,
    NumEqualVerify,
    NumNotEqual,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
    Min,
    Max,
    Within,

    Ripemd160,
    Sha1,
    Sha256,
    Hash160,
    Hash256,
    CheckSig,
    CheckSigVerify,
    CheckMultiSig,
    CheckMultiSigVerify,
    CheckDataSig,
    CheckDataSigVerify,
}

impl Op {
    /// Registry lookup for every selector that is not a push.
    ///
    /// Push selectors (`0x01..=0x4e`) need their payload and are decoded by
    /// the parser, so they return `None` here along with every unsupported
    /// byte.
    pub fn from_opcode(opcode: u8) -> Option<Op> {
        let op = match opcode {
            OP_0 => Op::Number(0),
            OP_1NEGATE => Op::Number(-1),
            OP_1..=OP_16 => Op::Number((opcode - (OP_1 - 1)) as i8),

            OP_NOP | OP_NOP1 | OP_NOP4 | OP_NOP5 | OP_NOP6 | OP_NOP7 | OP_NOP8 | OP_NOP9
            | OP_NOP10 => Op::Nop(opcode),
            OP_IF => Op::If,
            OP_NOTIF => Op::NotIf,
            OP_ELSE => Op::Else,
            OP_ENDIF => Op::EndIf,
            OP_VERIFY => Op::Verify,
            OP_RETURN => Op::Return,
            OP_CHECKLOCKTIMEVERIFY => Op::CheckLockTimeVerify,
            OP_CHECKSEQUENCEVERIFY => Op::CheckSequenceVerify,
            OP_CODESEPARATOR => Op::CodeSeparator,

            OP_TOALTSTACK => Op::ToAltStack,
            OP_FROMALTSTACK => Op::FromAltStack,
            OP_2DROP => Op::Drop2,
            OP_2DUP => Op::Dup2,
            OP_3DUP => Op::Dup3,
            OP_2OVER => Op::Over2,
            OP_2ROT => Op::Rot2,
            OP_2SWAP => Op::Swap2,
            OP_IFDUP => Op::IfDup,
            OP_DEPTH => Op::Depth,
            OP_DROP => Op::Drop,
            OP_DUP => Op::Dup,
            OP_NIP => Op::Nip,
            OP_OVER => Op::Over,
            OP_PICK => Op::Pick,
            OP_ROLL => Op::Roll,
            OP_ROT => Op::Rot,
            OP_SWAP => Op::Swap,
            OP_TUCK => Op::Tuck,

            OP_CAT => Op::Cat,
            OP_SPLIT => Op::Split,
            OP_NUM2BIN => Op::Num2Bin,
            OP_BIN2NUM => Op::Bin2Num,
            OP_SIZE => Op::Size,
            OP_REVERSEBYTES => Op::ReverseBytes,

            OP_AND => Op::And,
            OP_OR => Op::Or,
            OP_XOR => Op::Xor,
            OP_EQUAL => Op::Equal,
            OP_EQUALVERIFY => Op::EqualVerify,

            OP_1ADD => Op::Add1,
            OP_1SUB => Op::Sub1,
            OP_NEGATE => Op::Negate,
            OP_ABS => Op::Abs,
            OP_NOT => Op::Not,
            OP_0NOTEQUAL => Op::NotEqual0,
            OP_ADD => Op::Add,
            OP_SUB => Op::Sub,
            OP_DIV => Op::Div,
            OP_MOD => Op::Mod,
            OP_BOOLAND => Op::BoolAnd,
            OP_BOOLOR => Op::BoolOr,
            OP_NUMEQUAL => Op::NumEqual,
            OP_NUMEQUALVERIFY => Op::NumEqualVerify,
            OP_NUMNOTEQUAL => Op::NumNotEqual,
            OP_LESSTHAN => Op::LessThan,
            OP_GREATERTHAN => Op::GreaterThan,
            OP_LESSTHANOREQUAL => Op::LessThanOrEqual,
            OP_GREATERTHANOREQUAL => Op::GreaterThanOrEqual,
            OP_MIN => Op::Min,
            OP_MAX => Op::Max,
            OP_WITHIN => Op::Within,

            OP_RIPEMD160 => Op::Ripemd160,
            OP_SHA1 => Op::Sha1,
            OP_SHA256 => Op::Sha256,
            OP_HASH160 => Op::Hash160,
            OP_HASH256 => Op::Hash256,
            OP_CHECKSIG => Op::CheckSig,
            OP_CHECKSIGVERIFY => Op::CheckSigVerify,
            OP_CHECKMULTISIG => Op::CheckMultiSig,
            OP_CHECKMULTISIGVERIFY => Op::CheckMultiSigVerify,
            OP_CHECKDATASIG => Op::CheckDataSig,
            OP_CHECKDATASIGVERIFY => Op::CheckDataSigVerify,

            _ => return None,
        };
        Some(op)
    }

    /// The selector byte this op was decoded from.
    pub fn opcode(&self) -> u8 {
        match self {
            Op::Data(data) => data.len() as u8,
            Op::PushData { opcode, .. } => *opcode,
            Op::Number(0) => OP_0,
            Op::Number(-1) => OP_1NEGATE,
            Op::Number(n) => OP_1 - 1 + *n as u8,
            Op::Nop(opcode) => *opcode,
            Op::If => OP_IF,
            Op::NotIf => OP_NOTIF,
            Op::Else => OP_ELSE,
            Op::EndIf => OP_ENDIF,
            Op::Verify => OP_VERIFY,
            Op::Return => OP_RETURN,
            Op::CheckLockTimeVerify => OP_CHECKLOCKTIMEVERIFY,
            Op::CheckSequenceVerify => OP_CHECKSEQUENCEVERIFY,
            Op::CodeSeparator => OP_CODESEPARATOR,
            Op::ToAltStack => OP_TOALTSTACK,
            Op::FromAltStack => OP_FROMALTSTACK,
            Op::Drop2 => OP_2DROP,
            Op::Dup2 => OP_2DUP,
            Op::Dup3 => OP_3DUP,
            Op::Over2 => OP_2OVER,
            Op::Rot2 => OP_2ROT,
            Op::Swap2 => OP_2SWAP,
            Op::IfDup => OP_IFDUP,
            Op::Depth => OP_DEPTH,
            Op::Drop => OP_DROP,
            Op::Dup => OP_DUP,
            Op::Nip => OP_NIP,
            Op::Over => OP_OVER,
            Op::Pick => OP_PICK,
            Op::Roll => OP_ROLL,
            Op::Rot => OP_ROT,
            Op::Swap => OP_SWAP,
            Op::Tuck => OP_TUCK,
            Op::Cat => OP_CAT,
            Op::Split => OP_SPLIT,
            Op::Num2Bin => OP_NUM2BIN,
            Op::Bin2Num => OP_BIN2NUM,
            Op::Size => OP_SIZE,
            Op::ReverseBytes => OP_REVERSEBYTES,
            Op::And => OP_AND,
            Op::Or => OP_OR,
            Op::Xor => OP_XOR,
            Op::Equal => OP_EQUAL,
            Op::EqualVerify => OP_EQUALVERIFY,
            Op::Add1 => OP_1ADD,
            Op::Sub1 => OP_1SUB,
            Op::Negate => OP_NEGATE,
            Op::Abs => OP_ABS,
            Op::Not => OP_NOT,
            Op::NotEqual0 => OP_0NOTEQUAL,
            Op::Add => OP_ADD,
            Op::Sub => OP_SUB,
            Op::Div => OP_DIV,
            Op::Mod => OP_MOD,
            Op::BoolAnd => OP_BOOLAND,
            Op::BoolOr => OP_BOOLOR,
            Op::NumEqual => OP_NUMEQUAL,
            Op::NumEqualVerify => OP_NUMEQUALVERIFY,
            Op::NumNotEqual => OP_NUMNOTEQUAL,
            Op::LessThan => OP_LESSTHAN,
            Op::GreaterThan => OP_GREATERTHAN,
            Op::LessThanOrEqual => OP_LESSTHANOREQUAL,
            Op::GreaterThanOrEqual => OP_GREATERTHANOREQUAL,
            Op::Min => OP_MIN,
            Op::Max => OP_MAX,
            Op::Within => OP_WITHIN,
            Op::Ripemd160 => OP_RIPEMD160,
            Op::Sha1 => OP_SHA1,
            Op::Sha256 => OP_SHA256,
            Op::Hash160 => OP_HASH160,
            Op::Hash256 => OP_HASH256,
            Op::CheckSig => OP_CHECKSIG,
            Op::CheckSigVerify => OP_CHECKSIGVERIFY,
            Op::CheckMultiSig => OP_CHECKMULTISIG,
            Op::CheckMultiSigVerify => OP_CHECKMULTISIGVERIFY,
            Op::CheckDataSig => OP_CHECKDATASIG,
            Op::CheckDataSigVerify => OP_CHECKDATASIGVERIFY,
        }
    }

    pub fn name(&self) -> String {
        opcode_name(self.opcode())
    }

    /// Literal bytes carried by a push, if this is one.
    pub fn data(&self) -> Option<&[u8]> {
        match self {
            Op::Data(data) | Op::PushData { data, .. } => Some(data),
            _ => None,
        }
    }

    /// Conditionals run even inside a branch that is not executing, so the
    /// condition stack stays balanced.
    pub fn is_conditional(&self) -> bool {
        matches!(self, Op::If | Op::NotIf | Op::Else | Op::EndIf)
    }

    /// Run this op against `ctx`. An error means the input under
    /// validation is rejected; `ctx` must not be used for further ops.
    pub fn execute(&self, ctx: &mut ScriptContext<'_>) -> Result<(), InterpreterError> {
        ctx.step(self).map_err(|e| {
            tracing::debug!(
                offset = ctx.op_offset,
                op = %self.name(),
                code = %e.code,
                "op failed: {}",
                e.description
            );
            e
        })
    }
}

/// ASM form: pushes as hex, small numbers as decimals, everything else by
/// name.
impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Data(data) | Op::PushData { data, .. } => write!(f, "{}", hex::encode(data)),
            Op::Number(n) => write!(f, "{}", n),
            _ => f.write_str(&self.name()),
        }
    }
}
