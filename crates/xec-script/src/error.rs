/// Error types for script decoding and address handling.
///
/// These are structural failures: the bytes cannot be turned into a
/// program at all. Rejection of a well-formed program is reported by the
/// interpreter as an [`InterpreterError`](crate::interpreter::InterpreterError)
/// or a plain `false`.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// The selector byte is not a push and has no entry in the opcode registry.
    #[error("unsupported opcode 0x{0:02x} at offset {1}")]
    InvalidOpcode(u8, usize),

    /// A push declared more bytes than remain in the script.
    #[error("not enough data: push at offset {offset} needs {needed} bytes, {remaining} remaining")]
    DataTooSmall {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    /// Push data exceeds what a length prefix can express.
    #[error("data too big")]
    DataTooBig,

    /// Script exceeds the configured maximum size.
    #[error("script too large: {0} bytes (max {1})")]
    ScriptTooLarge(usize, usize),

    /// Attempted to append a push opcode without its data.
    #[error("use append_push_data for push opcode {0}")]
    InvalidOpcodeType(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Address version byte is neither mainnet nor testnet P2PKH.
    #[error("unsupported address version 0x{0:02x}")]
    UnsupportedAddress(u8),

    #[error("address checksum failed")]
    ChecksumFailed,

    #[error("not a P2PKH script")]
    NotP2PKH,

    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("primitives error: {0}")]
    Primitives(#[from] xec_primitives::PrimitivesError),
}
