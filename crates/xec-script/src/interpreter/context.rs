//! Per-execution state.
//!
//! A [`ScriptContext`] is created for exactly one run of a program against
//! one transaction input and is dropped afterwards. It is never shared, so
//! a parsed engine can be executed from many threads at once.

use std::collections::HashMap;

use crate::opcodes::{OP_16, OP_PUSHDATA1, OP_PUSHDATA2};
use crate::Script;

use super::config::Config;
use super::error::{InterpreterError, InterpreterErrorCode};
use super::op::Op;
use super::ops_crypto::HashType;
use super::scriptnum::ScriptNumber;
use super::stack::Stack;
use super::verifier::SignatureVerifier;
use super::TxContext;

/// Reference to a transaction output: the id of the transaction that
/// created it and its index in that transaction's outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutPoint {
    pub txid: [u8; 32],
    pub vout: u32,
}

impl OutPoint {
    pub fn new(txid: [u8; 32], vout: u32) -> Self {
        OutPoint { txid, vout }
    }
}

/// The parts of a previous output a spending input is checked against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrevOutput {
    pub locking_script: Script,
    pub satoshis: u64,
}

/// Lookup table from outpoint to the output it names.
pub type PrevOutputs = HashMap<OutPoint, PrevOutput>;

pub struct ScriptContext<'a> {
    pub(crate) stack: Stack,
    pub(crate) alt_stack: Stack,
    /// One entry per open `OP_IF`/`OP_NOTIF`: whether that branch executes.
    pub(crate) cond_stack: Vec<bool>,
    pub(crate) num_ops: usize,
    pub(crate) config: &'a Config,
    /// Byte offset of the running op within `unlocking || locking`.
    pub(crate) op_offset: usize,
    /// Byte offset where the locking script begins in the same stream.
    pub(crate) locking_start: usize,
    /// Where the signed script code begins within the locking script.
    pub(crate) script_code_start: usize,
    tx: &'a dyn TxContext,
    input_idx: usize,
    prev_outputs: &'a PrevOutputs,
    verifier: &'a dyn SignatureVerifier,
}

impl<'a> ScriptContext<'a> {
    pub fn new(
        tx: &'a dyn TxContext,
        input_idx: usize,
        prev_outputs: &'a PrevOutputs,
        verifier: &'a dyn SignatureVerifier,
        config: &'a Config,
    ) -> Self {
        ScriptContext {
            stack: Stack::new(config.max_num_length, config.require_minimal_data),
            alt_stack: Stack::new(config.max_num_length, config.require_minimal_data),
            cond_stack: Vec::new(),
            num_ops: 0,
            config,
            op_offset: 0,
            locking_start: 0,
            script_code_start: 0,
            tx,
            input_idx,
            prev_outputs,
            verifier,
        }
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    /// Seed the main stack, e.g. with a value produced outside the program.
    pub fn push(&mut self, data: Vec<u8>) {
        self.stack.push(data);
    }

    pub fn pop(&mut self) -> Result<Vec<u8>, InterpreterError> {
        self.stack.pop()
    }

    pub fn input_idx(&self) -> usize {
        self.input_idx
    }

    /// Whether every enclosing conditional branch is taken.
    pub fn is_branch_executing(&self) -> bool {
        self.cond_stack.iter().all(|&taken| taken)
    }

    /// Find a previous output by outpoint.
    pub fn lookup(&self, outpoint: &OutPoint) -> Option<&PrevOutput> {
        self.prev_outputs.get(outpoint)
    }

    /// The previous output spent by the input under validation. A miss is
    /// a validation failure, not a structural one.
    pub(crate) fn spent_output(&self) -> Result<&'a PrevOutput, InterpreterError> {
        let outpoint = self.tx.outpoint(self.input_idx).ok_or_else(|| {
            InterpreterError::new(
                InterpreterErrorCode::InvalidIndex,
                format!("transaction has no input {}", self.input_idx),
            )
        })?;
        self.prev_outputs.get(&outpoint).ok_or_else(|| {
            InterpreterError::new(
                InterpreterErrorCode::MissingPrevOutput,
                format!(
                    "previous output {}:{} not found",
                    hex::encode(outpoint.txid),
                    outpoint.vout
                ),
            )
        })
    }

    pub(crate) fn tx(&self) -> &'a dyn TxContext {
        self.tx
    }

    pub(crate) fn verifier(&self) -> &'a dyn SignatureVerifier {
        self.verifier
    }

    /// Run one op: enforce the per-op limits, skip it when inside a branch
    /// that is not executing, then apply it.
    pub(crate) fn step(&mut self, op: &Op) -> Result<(), InterpreterError> {
        if let Some(data) = op.data() {
            if !self.config.element_size_ok(data.len()) {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::ElementTooBig,
                    format!("element size {} exceeds max allowed size", data.len()),
                ));
            }
        }

        if op.opcode() > OP_16 {
            self.num_ops += 1;
            if let Some(max) = self.config.max_ops {
                if self.num_ops > max {
                    return Err(InterpreterError::new(
                        InterpreterErrorCode::TooManyOperations,
                        format!("exceeded max operation limit of {}", max),
                    ));
                }
            }
        }

        if !self.is_branch_executing() && !op.is_conditional() {
            return Ok(());
        }

        if self.config.require_minimal_data {
            check_minimal_push(op)?;
        }

        self.dispatch(op)?;

        if let Some(max) = self.config.max_stack_size {
            let combined = self.stack.depth() + self.alt_stack.depth();
            if combined > max {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::StackOverflow,
                    format!("combined stack size {} > max allowed {}", combined, max),
                ));
            }
        }
        Ok(())
    }

    fn dispatch(&mut self, op: &Op) -> Result<(), InterpreterError> {
        match op {
            Op::Data(data) | Op::PushData { data, .. } => {
                self.stack.push(data.clone());
                Ok(())
            }
            Op::Number(n) => {
                self.stack.push_int(ScriptNumber::from(*n as i64));
                Ok(())
            }
            Op::Nop(_) => Ok(()),

            Op::If => self.op_if(false),
            Op::NotIf => self.op_if(true),
            Op::Else => self.op_else(),
            Op::EndIf => self.op_endif(),
            Op::Verify => self.abstract_verify(InterpreterErrorCode::Verify),
            Op::Return => self.op_return(),
            Op::CheckLockTimeVerify => self.op_check_lock_time_verify(),
            Op::CheckSequenceVerify => self.op_check_sequence_verify(),
            Op::CodeSeparator => self.op_code_separator(),

            Op::ToAltStack => self.op_to_alt_stack(),
            Op::FromAltStack => self.op_from_alt_stack(),
            Op::Drop2 => self.stack.drop_n(2),
            Op::Dup2 => self.stack.dup_n(2),
            Op::Dup3 => self.stack.dup_n(3),
            Op::Over2 => self.stack.over_n(2),
            Op::Rot2 => self.stack.rot_n(2),
            Op::Swap2 => self.stack.swap_n(2),
            Op::IfDup => self.op_ifdup(),
            Op::Depth => self.op_depth(),
            Op::Drop => self.stack.drop_n(1),
            Op::Dup => self.stack.dup_n(1),
            Op::Nip => self.stack.nip_n(1).map(drop),
            Op::Over => self.stack.over_n(1),
            Op::Pick => self.op_pick(false),
            Op::Roll => self.op_pick(true),
            Op::Rot => self.stack.rot_n(1),
            Op::Swap => self.stack.swap_n(1),
            Op::Tuck => self.stack.tuck(),

            Op::Cat => self.op_cat(),
            Op::Split => self.op_split(),
            Op::Num2Bin => self.op_num2bin(),
            Op::Bin2Num => self.op_bin2num(),
            Op::Size => self.op_size(),
            Op::ReverseBytes => self.op_reverse_bytes(),

            Op::And => self.op_bitwise(|a, b| a & b),
            Op::Or => self.op_bitwise(|a, b| a | b),
            Op::Xor => self.op_bitwise(|a, b| a ^ b),
            Op::Equal => self.op_equal(),
            Op::EqualVerify => {
                self.op_equal()?;
                self.abstract_verify(InterpreterErrorCode::EqualVerify)
            }

            Op::Add1 => self.op_unary_int("OP_1ADD", |a| a.checked_add(1)),
            Op::Sub1 => self.op_unary_int("OP_1SUB", |a| a.checked_sub(1)),
            Op::Negate => self.op_unary_int("OP_NEGATE", |a| a.checked_neg()),
            Op::Abs => self.op_unary_int("OP_ABS", |a| a.checked_abs()),
            Op::Not => self.op_unary_int("OP_NOT", |a| Some((a == 0) as i64)),
            Op::NotEqual0 => self.op_unary_int("OP_0NOTEQUAL", |a| Some((a != 0) as i64)),
            Op::Add => self.op_binary_int("OP_ADD", |a, b| a.checked_add(b)),
            Op::Sub => self.op_binary_int("OP_SUB", |a, b| a.checked_sub(b)),
            Op::Div => self.op_div_mod(false),
            Op::Mod => self.op_div_mod(true),
            Op::BoolAnd => self.op_bool_binop(|a, b| a != 0 && b != 0),
            Op::BoolOr => self.op_bool_binop(|a, b| a != 0 || b != 0),
            Op::NumEqual => self.op_bool_binop(|a, b| a == b),
            Op::NumEqualVerify => {
                self.op_bool_binop(|a, b| a == b)?;
                self.abstract_verify(InterpreterErrorCode::NumEqualVerify)
            }
            Op::NumNotEqual => self.op_bool_binop(|a, b| a != b),
            Op::LessThan => self.op_bool_binop(|a, b| a < b),
            Op::GreaterThan => self.op_bool_binop(|a, b| a > b),
            Op::LessThanOrEqual => self.op_bool_binop(|a, b| a <= b),
            Op::GreaterThanOrEqual => self.op_bool_binop(|a, b| a >= b),
            Op::Min => self.op_binary_int("OP_MIN", |a, b| Some(a.min(b))),
            Op::Max => self.op_binary_int("OP_MAX", |a, b| Some(a.max(b))),
            Op::Within => self.op_within(),

            Op::Ripemd160 => self.op_hash(HashType::Ripemd160),
            Op::Sha1 => self.op_hash(HashType::Sha1),
            Op::Sha256 => self.op_hash(HashType::Sha256),
            Op::Hash160 => self.op_hash(HashType::Hash160),
            Op::Hash256 => self.op_hash(HashType::Hash256),
            Op::CheckSig => self.op_checksig(),
            Op::CheckSigVerify => {
                self.op_checksig()?;
                self.abstract_verify(InterpreterErrorCode::CheckSigVerify)
            }
            Op::CheckMultiSig => self.op_checkmultisig(),
            Op::CheckMultiSigVerify => {
                self.op_checkmultisig()?;
                self.abstract_verify(InterpreterErrorCode::CheckMultiSigVerify)
            }
            Op::CheckDataSig => self.op_checkdatasig(),
            Op::CheckDataSigVerify => {
                self.op_checkdatasig()?;
                self.abstract_verify(InterpreterErrorCode::CheckDataSigVerify)
            }
        }
    }
}

/// Reject a push that a shorter encoding could have expressed.
fn check_minimal_push(op: &Op) -> Result<(), InterpreterError> {
    let Some(data) = op.data() else {
        return Ok(());
    };
    let opcode = op.opcode();
    let expected = match data {
        [] => "OP_0",
        [n @ 1..=16] => return Err(non_minimal(format!("push of {} should use OP_{}", n, n))),
        [0x81] => "OP_1NEGATE",
        _ if data.len() <= 75 => {
            if opcode as usize == data.len() {
                return Ok(());
            }
            "a direct push"
        }
        _ if data.len() <= 0xff => {
            if opcode == OP_PUSHDATA1 {
                return Ok(());
            }
            "OP_PUSHDATA1"
        }
        _ if data.len() <= 0xffff => {
            if opcode == OP_PUSHDATA2 {
                return Ok(());
            }
            "OP_PUSHDATA2"
        }
        _ => return Ok(()),
    };
    Err(non_minimal(format!(
        "{}-byte push encoded with opcode 0x{:02x} should use {}",
        data.len(),
        opcode,
        expected
    )))
}

fn non_minimal(msg: String) -> InterpreterError {
    InterpreterError::new(InterpreterErrorCode::MinimalData, msg)
}
