//! Decoding script bytes into [`Op`]s.
//!
//! The unlocking and locking scripts are decoded as one stream, in that
//! order. While decoding, the first 20-byte or 65-byte direct push fixes
//! the address the engine reports; later candidates are ignored.

use xec_primitives::util::ByteReader;

use crate::address::{Address, Network};
use crate::opcodes::*;
use crate::ScriptError;

use super::config::Config;
use super::op::Op;

/// Holds the address derived during a parse. Only the first offer sticks.
#[derive(Debug, Default)]
pub struct AddressSlot {
    address: Option<Address>,
}

impl AddressSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<&Address> {
        self.address.as_ref()
    }

    /// Offer a direct push as an address candidate.
    fn offer(&mut self, data: &[u8], network: Network) {
        if self.address.is_some() {
            return;
        }
        self.address = match data.len() {
            20 => {
                let mut pkh = [0u8; 20];
                pkh.copy_from_slice(data);
                Some(Address::from_public_key_hash(&pkh, network))
            }
            65 => Some(Address::from_public_key_bytes(data, network)),
            _ => None,
        };
        if let Some(address) = &self.address {
            tracing::trace!(len = data.len(), %address, "address derived from push");
        }
    }

    /// The derived address, or the empty string when none was found.
    pub fn into_string(self) -> String {
        self.address.map(|a| a.address_string).unwrap_or_default()
    }
}

fn read_push<'a>(
    reader: &mut ByteReader<'a>,
    offset: usize,
    len: usize,
) -> Result<&'a [u8], ScriptError> {
    let remaining = reader.remaining();
    reader.read_bytes(len).map_err(|_| ScriptError::DataTooSmall {
        offset,
        needed: len,
        remaining,
    })
}

/// Decode one op at the reader's position.
///
/// The reader must not be exhausted. On error the engine under
/// construction is abandoned, so the reader position is unspecified.
pub fn parse_op(
    reader: &mut ByteReader<'_>,
    slot: &mut AddressSlot,
    network: Network,
) -> Result<Op, ScriptError> {
    let offset = reader.position();
    let opcode = reader.read_u8()?;

    let op = match opcode {
        OP_DATA_1..=OP_DATA_75 => {
            let data = read_push(reader, offset, opcode as usize)?;
            slot.offer(data, network);
            Op::Data(data.to_vec())
        }
        OP_PUSHDATA1 | OP_PUSHDATA2 | OP_PUSHDATA4 => {
            let width = match opcode {
                OP_PUSHDATA1 => 1,
                OP_PUSHDATA2 => 2,
                _ => 4,
            };
            let len_bytes = read_push(reader, offset, width)?;
            let len = len_bytes
                .iter()
                .rev()
                .fold(0usize, |acc, &b| (acc << 8) | b as usize);
            let data = read_push(reader, offset, len)?;
            Op::PushData {
                opcode,
                data: data.to_vec(),
            }
        }
        _ => Op::from_opcode(opcode).ok_or_else(|| {
            tracing::debug!(opcode = %opcode_name(opcode), offset, "unsupported opcode");
            ScriptError::InvalidOpcode(opcode, offset)
        })?,
    };

    tracing::trace!(offset, op = %op.name(), "parsed op");
    Ok(op)
}

/// A decoded script pair.
#[derive(Debug, Default)]
pub struct Program {
    pub ops: Vec<Op>,
    /// Byte offset of each op within `unlocking || locking`.
    pub offsets: Vec<usize>,
    /// Offset of the first locking script byte in the same stream.
    pub locking_start: usize,
    /// Derived address, or the empty string when none was found.
    pub address: String,
}

/// Decode `unlocking || locking` into ops and the derived address.
///
/// Fails on the first unsupported opcode or truncated push; a partial op
/// list is never returned.
pub fn parse(unlocking: &[u8], locking: &[u8], config: &Config) -> Result<Program, ScriptError> {
    if let Some(max) = config.max_script_size {
        for script in [unlocking, locking] {
            if script.len() > max {
                return Err(ScriptError::ScriptTooLarge(script.len(), max));
            }
        }
    }

    let program = [unlocking, locking].concat();
    let mut reader = ByteReader::new(&program);
    let mut slot = AddressSlot::new();
    let mut ops = Vec::new();
    let mut offsets = Vec::new();

    while !reader.is_exhausted() {
        offsets.push(reader.position());
        ops.push(parse_op(&mut reader, &mut slot, config.network)?);
    }

    Ok(Program {
        ops,
        offsets,
        locking_start: unlocking.len(),
        address: slot.into_string(),
    })
}
