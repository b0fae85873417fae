//! Stack manipulation operations that need more than a single
//! [`Stack`](super::stack::Stack) call.

use super::context::ScriptContext;
use super::error::{InterpreterError, InterpreterErrorCode};
use super::scriptnum::ScriptNumber;
use super::stack::as_bool;

impl<'a> ScriptContext<'a> {
    pub(crate) fn op_to_alt_stack(&mut self) -> Result<(), InterpreterError> {
        let so = self.stack.pop()?;
        self.alt_stack.push(so);
        Ok(())
    }

    pub(crate) fn op_from_alt_stack(&mut self) -> Result<(), InterpreterError> {
        let so = self.alt_stack.pop().map_err(|_| {
            InterpreterError::new(
                InterpreterErrorCode::InvalidAltStackOperation,
                "attempt to pop from an empty alt stack".to_string(),
            )
        })?;
        self.stack.push(so);
        Ok(())
    }

    pub(crate) fn op_ifdup(&mut self) -> Result<(), InterpreterError> {
        if as_bool(self.stack.peek(0)?) {
            self.stack.dup_n(1)?;
        }
        Ok(())
    }

    pub(crate) fn op_depth(&mut self) -> Result<(), InterpreterError> {
        let depth = self.stack.depth() as i64;
        self.stack.push_int(ScriptNumber::from(depth));
        Ok(())
    }

    /// `OP_PICK` copies, `OP_ROLL` moves, the item `n` places below the
    /// top, where `n` is popped first.
    pub(crate) fn op_pick(&mut self, roll: bool) -> Result<(), InterpreterError> {
        let n = self.stack.pop_int()?.value();
        if n < 0 || n as usize >= self.stack.depth() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidStackOperation,
                format!("index {} is invalid for stack size {}", n, self.stack.depth()),
            ));
        }
        if roll {
            self.stack.roll_n(n as usize)
        } else {
            self.stack.pick_n(n as usize)
        }
    }
}
