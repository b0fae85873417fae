//! Splice and bitwise operations.

use super::context::ScriptContext;
use super::error::{InterpreterError, InterpreterErrorCode};
use super::scriptnum::{is_minimally_encoded, minimally_encode, ScriptNumber};

impl<'a> ScriptContext<'a> {
    pub(crate) fn op_cat(&mut self) -> Result<(), InterpreterError> {
        let b = self.stack.pop()?;
        let mut a = self.stack.pop()?;
        let max = self.config.max_built_element_size();
        if a.len() + b.len() > max {
            return Err(InterpreterError::new(
                InterpreterErrorCode::ElementTooBig,
                format!("concatenated size {} exceeds max allowed size {}", a.len() + b.len(), max),
            ));
        }
        a.extend_from_slice(&b);
        self.stack.push(a);
        Ok(())
    }

    /// `x n -- x[..n] x[n..]`
    pub(crate) fn op_split(&mut self) -> Result<(), InterpreterError> {
        let n = self.stack.pop_int()?.value();
        let mut data = self.stack.pop()?;
        if n < 0 || n as usize > data.len() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidSplitRange,
                format!("split position {} is outside 0..={}", n, data.len()),
            ));
        }
        let tail = data.split_off(n as usize);
        self.stack.push(data);
        self.stack.push(tail);
        Ok(())
    }

    /// Re-encode a number into exactly `size` bytes, sign bit in the last
    /// byte.
    pub(crate) fn op_num2bin(&mut self) -> Result<(), InterpreterError> {
        let size = self.stack.pop_int()?.value();
        let mut raw = self.stack.pop()?;

        let max = self.config.max_built_element_size();
        if size < 0 || size as usize > max {
            return Err(InterpreterError::new(
                InterpreterErrorCode::ElementTooBig,
                format!("requested size {} is outside 0..={}", size, max),
            ));
        }
        let size = size as usize;

        minimally_encode(&mut raw);
        if raw.len() > size {
            return Err(InterpreterError::new(
                InterpreterErrorCode::ImpossibleEncoding,
                format!("{} byte number cannot fit in {} bytes", raw.len(), size),
            ));
        }
        if raw.len() < size {
            let mut sign = 0x00;
            if let Some(last) = raw.last_mut() {
                sign = *last & 0x80;
                *last &= 0x7f;
            }
            raw.resize(size - 1, 0x00);
            raw.push(sign);
        }
        self.stack.push(raw);
        Ok(())
    }

    pub(crate) fn op_bin2num(&mut self) -> Result<(), InterpreterError> {
        let mut data = self.stack.pop()?;
        minimally_encode(&mut data);
        if !is_minimally_encoded(&data, self.config.max_num_length) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidNumberRange,
                format!("{} byte number exceeds the numeric operand size", data.len()),
            ));
        }
        self.stack.push(data);
        Ok(())
    }

    pub(crate) fn op_size(&mut self) -> Result<(), InterpreterError> {
        let len = self.stack.peek(0)?.len() as i64;
        self.stack.push_int(ScriptNumber::from(len));
        Ok(())
    }

    pub(crate) fn op_reverse_bytes(&mut self) -> Result<(), InterpreterError> {
        self.stack.peek_mut(0)?.reverse();
        Ok(())
    }

    pub(crate) fn op_bitwise(&mut self, f: impl Fn(u8, u8) -> u8) -> Result<(), InterpreterError> {
        let b = self.stack.pop()?;
        let a = self.stack.pop()?;
        if a.len() != b.len() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidOperandSize,
                format!("operands have different sizes {} and {}", a.len(), b.len()),
            ));
        }
        let out = a.iter().zip(&b).map(|(&x, &y)| f(x, y)).collect();
        self.stack.push(out);
        Ok(())
    }

    pub(crate) fn op_equal(&mut self) -> Result<(), InterpreterError> {
        let b = self.stack.pop()?;
        let a = self.stack.pop()?;
        self.stack.push_bool(a == b);
        Ok(())
    }
}
