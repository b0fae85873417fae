/// Error types for transaction operations.
///
/// A script that decodes but fails to validate is not an error here;
/// verification reports it as `Ok(false)`.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// The transaction structure is invalid (e.g. an input index out of range).
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),
    /// An error occurred while producing an unlocking script.
    #[error("signing error: {0}")]
    SigningError(String),
    /// Binary or hex decoding failed.
    #[error("serialization error: {0}")]
    SerializationError(String),
    /// The output spent by an input is not in the lookup table.
    #[error("previous output not found: {0}")]
    MissingPrevOutput(String),
    /// The unlocking or locking script could not be decoded.
    #[error("script error: {0}")]
    Script(#[from] xec_script::ScriptError),
    #[error("primitives error: {0}")]
    Primitives(#[from] xec_primitives::PrimitivesError),
}
