//! Numeric operations. Operands are decoded by the stack under the
//! context's length and minimality rules; results may be wider.

use super::context::ScriptContext;
use super::error::{InterpreterError, InterpreterErrorCode};
use super::scriptnum::ScriptNumber;

impl<'a> ScriptContext<'a> {
    pub(crate) fn op_unary_int(
        &mut self,
        what: &str,
        f: impl FnOnce(i64) -> Option<i64>,
    ) -> Result<(), InterpreterError> {
        let a = self.stack.pop_int()?;
        let result = ScriptNumber::checked(f(a.value()), what)?;
        self.stack.push_int(result);
        Ok(())
    }

    /// `a b -- f(a, b)`; `b` is the top item.
    pub(crate) fn op_binary_int(
        &mut self,
        what: &str,
        f: impl FnOnce(i64, i64) -> Option<i64>,
    ) -> Result<(), InterpreterError> {
        let b = self.stack.pop_int()?;
        let a = self.stack.pop_int()?;
        let result = ScriptNumber::checked(f(a.value(), b.value()), what)?;
        self.stack.push_int(result);
        Ok(())
    }

    pub(crate) fn op_bool_binop(
        &mut self,
        f: impl FnOnce(i64, i64) -> bool,
    ) -> Result<(), InterpreterError> {
        let b = self.stack.pop_int()?;
        let a = self.stack.pop_int()?;
        self.stack.push_bool(f(a.value(), b.value()));
        Ok(())
    }

    /// Truncating division; the remainder takes the sign of the dividend.
    pub(crate) fn op_div_mod(&mut self, modulo: bool) -> Result<(), InterpreterError> {
        let b = self.stack.pop_int()?.value();
        let a = self.stack.pop_int()?.value();
        if b == 0 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::DivideByZero,
                "divide by zero".to_string(),
            ));
        }
        let result = if modulo {
            ScriptNumber::checked(a.checked_rem(b), "OP_MOD")?
        } else {
            ScriptNumber::checked(a.checked_div(b), "OP_DIV")?
        };
        self.stack.push_int(result);
        Ok(())
    }

    /// `x min max -- min <= x < max`
    pub(crate) fn op_within(&mut self) -> Result<(), InterpreterError> {
        let max = self.stack.pop_int()?;
        let min = self.stack.pop_int()?;
        let x = self.stack.pop_int()?;
        self.stack.push_bool(min <= x && x < max);
        Ok(())
    }
}
