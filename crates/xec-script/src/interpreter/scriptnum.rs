//! Script number encoding.
//!
//! Numbers on the stack are little-endian sign-magnitude byte strings: the
//! top bit of the last byte is the sign. Numeric opcodes accept operands of
//! at most `max_num_length` bytes (4 by default) but may produce results
//! that are wider; those stay valid as long as nothing reads them back as
//! numbers.

use super::error::{InterpreterError, InterpreterErrorCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScriptNumber(pub i64);

impl ScriptNumber {
    pub fn new(val: i64) -> Self {
        ScriptNumber(val)
    }

    /// Decode an operand, enforcing the length limit and, when requested,
    /// minimal encoding.
    pub fn from_bytes(
        bytes: &[u8],
        max_len: usize,
        require_minimal: bool,
    ) -> Result<Self, InterpreterError> {
        // An i64 holds at most 8 bytes of magnitude.
        let max_len = max_len.min(8);
        if bytes.len() > max_len {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NumberTooBig,
                format!(
                    "numeric value encoded as {:02x?} is {} bytes which exceeds the max allowed of {}",
                    bytes,
                    bytes.len(),
                    max_len
                ),
            ));
        }
        if require_minimal && !is_minimally_encoded(bytes, max_len) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::MinimalData,
                format!("numeric value encoded as {:02x?} is not minimally encoded", bytes),
            ));
        }

        let Some(&last) = bytes.last() else {
            return Ok(ScriptNumber(0));
        };

        let mut magnitude: u64 = 0;
        for (i, &b) in bytes.iter().enumerate() {
            magnitude |= (b as u64) << (8 * i);
        }
        if last & 0x80 != 0 {
            magnitude &= !(0x80u64 << (8 * (bytes.len() - 1)));
            Ok(ScriptNumber(-(magnitude as i64)))
        } else {
            Ok(ScriptNumber(magnitude as i64))
        }
    }

    /// Minimal encoding of this value. Zero encodes as the empty string.
    pub fn to_bytes(self) -> Vec<u8> {
        if self.0 == 0 {
            return Vec::new();
        }

        let negative = self.0 < 0;
        let mut magnitude = self.0.unsigned_abs();
        let mut out = Vec::with_capacity(9);
        while magnitude > 0 {
            out.push((magnitude & 0xff) as u8);
            magnitude >>= 8;
        }

        // The sign needs its own byte when the top bit is already used.
        let last = out.len() - 1;
        if out[last] & 0x80 != 0 {
            out.push(if negative { 0x80 } else { 0x00 });
        } else if negative {
            out[last] |= 0x80;
        }
        out
    }

    pub fn value(self) -> i64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub(crate) fn checked(
        result: Option<i64>,
        what: &str,
    ) -> Result<Self, InterpreterError> {
        result.map(ScriptNumber).ok_or_else(|| {
            InterpreterError::new(
                InterpreterErrorCode::InvalidNumberRange,
                format!("{} overflowed", what),
            )
        })
    }
}

impl From<i64> for ScriptNumber {
    fn from(val: i64) -> Self {
        ScriptNumber(val)
    }
}

/// Whether `bytes` is the shortest encoding of its value.
///
/// A trailing `0x00` or `0x80` is only allowed when the byte before it has
/// its top bit set, i.e. when the extra byte is needed to carry the sign.
pub fn is_minimally_encoded(bytes: &[u8], max_len: usize) -> bool {
    if bytes.len() > max_len {
        return false;
    }
    match bytes {
        [] => true,
        [.., last] if last & 0x7f != 0 => true,
        [_] => false,
        [.., prev, _] => prev & 0x80 != 0,
    }
}

/// Rewrite `data` in place as the minimal encoding of the same number.
///
/// Works on byte strings of any length, so it is usable on values wider
/// than a numeric operand (`OP_BIN2NUM`, `OP_NUM2BIN`).
pub fn minimally_encode(data: &mut Vec<u8>) {
    let Some(&last) = data.last() else {
        return;
    };

    // The last byte carries magnitude bits, so nothing can be dropped.
    if last & 0x7f != 0 {
        return;
    }

    let sign = last & 0x80;
    let body_end = data[..data.len() - 1]
        .iter()
        .rposition(|&b| b != 0)
        .map(|i| i + 1);

    match body_end {
        // All magnitude bytes are zero: the value is (negative) zero.
        None => data.clear(),
        Some(end) => {
            data.truncate(end);
            if data[end - 1] & 0x80 != 0 {
                data.push(sign);
            } else {
                data[end - 1] |= sign;
            }
        }
    }
}
