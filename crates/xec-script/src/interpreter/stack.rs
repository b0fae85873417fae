//! The value stack.
//!
//! Items are raw byte strings. Indices passed to the `*_n` helpers count
//! from the top: `0` is the top item.

use super::error::{InterpreterError, InterpreterErrorCode};
use super::scriptnum::ScriptNumber;

/// Interpret a stack item as a boolean.
///
/// Any non-zero byte makes the value true, except that a lone sign bit in
/// the last byte (negative zero) is still false.
pub fn as_bool(t: &[u8]) -> bool {
    match t.iter().position(|&b| b != 0) {
        None => false,
        Some(i) => !(i == t.len() - 1 && t[i] == 0x80),
    }
}

pub fn from_bool(v: bool) -> Vec<u8> {
    if v {
        vec![1]
    } else {
        vec![]
    }
}

fn invalid(msg: String) -> InterpreterError {
    InterpreterError::new(InterpreterErrorCode::InvalidStackOperation, msg)
}

#[derive(Debug, Clone, Default)]
pub struct Stack {
    items: Vec<Vec<u8>>,
    max_num_length: usize,
    require_minimal: bool,
}

impl Stack {
    pub fn new(max_num_length: usize, require_minimal: bool) -> Self {
        Stack {
            items: Vec::new(),
            max_num_length,
            require_minimal,
        }
    }

    pub fn depth(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Bottom-to-top view of the stack.
    pub fn items(&self) -> &[Vec<u8>] {
        &self.items
    }

    pub fn push(&mut self, data: Vec<u8>) {
        self.items.push(data);
    }

    pub fn push_int(&mut self, n: ScriptNumber) {
        self.push(n.to_bytes());
    }

    pub fn push_bool(&mut self, val: bool) {
        self.push(from_bool(val));
    }

    pub fn pop(&mut self) -> Result<Vec<u8>, InterpreterError> {
        self.items
            .pop()
            .ok_or_else(|| invalid("attempt to pop from an empty stack".to_string()))
    }

    pub fn pop_int(&mut self) -> Result<ScriptNumber, InterpreterError> {
        let data = self.pop()?;
        self.decode_int(&data)
    }

    pub fn pop_bool(&mut self) -> Result<bool, InterpreterError> {
        Ok(as_bool(&self.pop()?))
    }

    pub fn peek(&self, idx: usize) -> Result<&[u8], InterpreterError> {
        let sz = self.items.len();
        if idx >= sz {
            return Err(invalid(format!(
                "index {} is invalid for stack size {}",
                idx, sz
            )));
        }
        Ok(&self.items[sz - idx - 1])
    }

    pub fn peek_int(&self, idx: usize) -> Result<ScriptNumber, InterpreterError> {
        self.decode_int(self.peek(idx)?)
    }

    /// Mutable access to the item `idx` places below the top.
    pub fn peek_mut(&mut self, idx: usize) -> Result<&mut Vec<u8>, InterpreterError> {
        let sz = self.items.len();
        if idx >= sz {
            return Err(invalid(format!(
                "index {} is invalid for stack size {}",
                idx, sz
            )));
        }
        Ok(&mut self.items[sz - idx - 1])
    }

    fn decode_int(&self, data: &[u8]) -> Result<ScriptNumber, InterpreterError> {
        ScriptNumber::from_bytes(data, self.max_num_length, self.require_minimal)
    }

    /// Remove and return the item `idx` places below the top.
    pub fn nip_n(&mut self, idx: usize) -> Result<Vec<u8>, InterpreterError> {
        let sz = self.items.len();
        if idx >= sz {
            return Err(invalid(format!(
                "index {} is invalid for stack size {}",
                idx, sz
            )));
        }
        Ok(self.items.remove(sz - idx - 1))
    }

    /// `x1 x2 -- x2 x1 x2`
    pub fn tuck(&mut self) -> Result<(), InterpreterError> {
        let so2 = self.pop()?;
        let so1 = self.pop()?;
        self.push(so2.clone());
        self.push(so1);
        self.push(so2);
        Ok(())
    }

    pub fn drop_n(&mut self, n: usize) -> Result<(), InterpreterError> {
        if self.depth() < n {
            return Err(invalid(format!(
                "attempt to drop {} items from stack of size {}",
                n,
                self.depth()
            )));
        }
        self.items.truncate(self.depth() - n);
        Ok(())
    }

    /// Duplicate the top `n` items, preserving order.
    pub fn dup_n(&mut self, n: usize) -> Result<(), InterpreterError> {
        if self.depth() < n {
            return Err(invalid(format!(
                "attempt to dup {} stack items with depth {}",
                n,
                self.depth()
            )));
        }
        let start = self.depth() - n;
        self.items.extend_from_within(start..);
        Ok(())
    }

    /// Move the `n` items at depth `2n..3n` to the top.
    pub fn rot_n(&mut self, n: usize) -> Result<(), InterpreterError> {
        let entry = 3 * n - 1;
        for _ in 0..n {
            let so = self.nip_n(entry)?;
            self.push(so);
        }
        Ok(())
    }

    /// Swap the top `n` items with the `n` items below them.
    pub fn swap_n(&mut self, n: usize) -> Result<(), InterpreterError> {
        let entry = 2 * n - 1;
        for _ in 0..n {
            let so = self.nip_n(entry)?;
            self.push(so);
        }
        Ok(())
    }

    /// Copy the `n` items below the top `n` items onto the top.
    pub fn over_n(&mut self, n: usize) -> Result<(), InterpreterError> {
        let entry = 2 * n - 1;
        for _ in 0..n {
            let so = self.peek(entry)?.to_vec();
            self.push(so);
        }
        Ok(())
    }

    pub fn pick_n(&mut self, n: usize) -> Result<(), InterpreterError> {
        let so = self.peek(n)?.to_vec();
        self.push(so);
        Ok(())
    }

    pub fn roll_n(&mut self, n: usize) -> Result<(), InterpreterError> {
        let so = self.nip_n(n)?;
        self.push(so);
        Ok(())
    }
}
