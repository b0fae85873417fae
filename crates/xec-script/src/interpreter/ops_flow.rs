//! Flow control operations.

use super::context::ScriptContext;
use super::error::{InterpreterError, InterpreterErrorCode};
use super::scriptnum::ScriptNumber;

/// Lock times below this are block heights, at or above it unix times.
const LOCK_TIME_THRESHOLD: i64 = 500_000_000;

/// An input with this sequence is final and ignores the lock time.
const SEQUENCE_FINAL: u32 = 0xffff_ffff;

/// Set on a sequence number that carries no relative lock time.
const SEQUENCE_LOCK_TIME_DISABLED: i64 = 1 << 31;

/// Set on a relative lock time counted in 512-second units, not blocks.
const SEQUENCE_LOCK_TIME_TYPE: i64 = 1 << 22;

const SEQUENCE_LOCK_TIME_MASK: i64 = 0x0000_ffff;

/// Timelock operands may use five bytes so that every `u32` lock time fits.
const LOCK_TIME_NUM_LENGTH: usize = 5;

fn unbalanced(name: &str) -> InterpreterError {
    InterpreterError::new(
        InterpreterErrorCode::UnbalancedConditional,
        format!(
            "encountered opcode {} with no matching opcode to begin conditional execution",
            name
        ),
    )
}

impl<'a> ScriptContext<'a> {
    /// `OP_IF` / `OP_NOTIF`. The condition is only popped when the enclosing
    /// branch executes; otherwise a not-taken entry keeps the nesting.
    pub(crate) fn op_if(&mut self, negate: bool) -> Result<(), InterpreterError> {
        let mut taken = false;
        if self.is_branch_executing() {
            taken = self.stack.pop_bool()? != negate;
        }
        self.cond_stack.push(taken);
        Ok(())
    }

    pub(crate) fn op_else(&mut self) -> Result<(), InterpreterError> {
        let top = self.cond_stack.last_mut().ok_or_else(|| unbalanced("OP_ELSE"))?;
        *top = !*top;
        Ok(())
    }

    pub(crate) fn op_endif(&mut self) -> Result<(), InterpreterError> {
        self.cond_stack.pop().ok_or_else(|| unbalanced("OP_ENDIF"))?;
        Ok(())
    }

    /// Pop the top item and fail with `code` unless it is true.
    pub(crate) fn abstract_verify(&mut self, code: InterpreterErrorCode) -> Result<(), InterpreterError> {
        if !self.stack.pop_bool()? {
            return Err(InterpreterError::new(code, format!("{} failed", code)));
        }
        Ok(())
    }

    pub(crate) fn op_return(&mut self) -> Result<(), InterpreterError> {
        Err(InterpreterError::new(
            InterpreterErrorCode::EarlyReturn,
            "script returned early".to_string(),
        ))
    }

    /// The timelock operand on top of the stack. It is left in place.
    fn lock_time_operand(&self) -> Result<i64, InterpreterError> {
        let value = ScriptNumber::from_bytes(
            self.stack.peek(0)?,
            LOCK_TIME_NUM_LENGTH,
            self.config.require_minimal_data,
        )?
        .value();
        if value < 0 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NegativeLockTime,
                format!("negative lock time: {}", value),
            ));
        }
        Ok(value)
    }

    fn input_sequence(&self) -> Result<u32, InterpreterError> {
        self.tx().input_sequence(self.input_idx()).ok_or_else(|| {
            InterpreterError::new(
                InterpreterErrorCode::InvalidIndex,
                format!("transaction has no input {}", self.input_idx()),
            )
        })
    }

    /// `OP_CHECKLOCKTIMEVERIFY`: the transaction's lock time must be of the
    /// same kind as the operand and at least as large, and the input must
    /// not be final.
    pub(crate) fn op_check_lock_time_verify(&mut self) -> Result<(), InterpreterError> {
        let lock_time = self.lock_time_operand()?;
        verify_lock_time(self.tx().lock_time() as i64, LOCK_TIME_THRESHOLD, lock_time)?;

        if self.input_sequence()? == SEQUENCE_FINAL {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnsatisfiedLockTime,
                "transaction input is finalized".to_string(),
            ));
        }
        Ok(())
    }

    /// `OP_CHECKSEQUENCEVERIFY`: relative lock time against the input's
    /// sequence number. An operand with the disable bit set is a no-op.
    pub(crate) fn op_check_sequence_verify(&mut self) -> Result<(), InterpreterError> {
        let sequence = self.lock_time_operand()?;
        if sequence & SEQUENCE_LOCK_TIME_DISABLED != 0 {
            return Ok(());
        }

        let version = self.tx().tx_version();
        if version < 2 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnsatisfiedLockTime,
                format!("invalid transaction version: {}", version),
            ));
        }

        let tx_sequence = self.input_sequence()? as i64;
        if tx_sequence & SEQUENCE_LOCK_TIME_DISABLED != 0 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnsatisfiedLockTime,
                format!(
                    "transaction sequence 0x{:x} has the lock time disabled bit set",
                    tx_sequence
                ),
            ));
        }

        let mask = SEQUENCE_LOCK_TIME_TYPE | SEQUENCE_LOCK_TIME_MASK;
        verify_lock_time(tx_sequence & mask, SEQUENCE_LOCK_TIME_TYPE, sequence & mask)
    }

    /// `OP_CODESEPARATOR` in the locking script moves the start of the
    /// signed script code to just past itself. In the unlocking script it
    /// has no effect, since signatures only commit to the locking script.
    pub(crate) fn op_code_separator(&mut self) -> Result<(), InterpreterError> {
        if let Some(rel) = self.op_offset.checked_sub(self.locking_start) {
            self.script_code_start = rel + 1;
        }
        Ok(())
    }
}

/// Both values must be on the same side of `threshold`, and the required
/// `lock_time` must not exceed the transaction's.
fn verify_lock_time(tx_lock_time: i64, threshold: i64, lock_time: i64) -> Result<(), InterpreterError> {
    if (tx_lock_time < threshold) != (lock_time < threshold) {
        return Err(InterpreterError::new(
            InterpreterErrorCode::UnsatisfiedLockTime,
            format!(
                "mismatched lock time types: tx lock time {}, required {}",
                tx_lock_time, lock_time
            ),
        ));
    }
    if lock_time > tx_lock_time {
        return Err(InterpreterError::new(
            InterpreterErrorCode::UnsatisfiedLockTime,
            format!(
                "lock time requirement not satisfied: {} > {}",
                lock_time, tx_lock_time
            ),
        ));
    }
    Ok(())
}
