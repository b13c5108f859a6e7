/// Errors raised by transaction parsing, signing, and sighash computation.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// The transaction structure is invalid.
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),
    /// Input signing failed.
    #[error("signing error: {0}")]
    SigningError(String),
    /// Wire format encoding or decoding failed.
    #[error("serialization error: {0}")]
    SerializationError(String),
    /// The sighash directive byte is malformed.
    #[error("invalid sighash directive: 0x{0:02x}")]
    InvalidSighashDirective(u32),
    /// Forwarded script error.
    #[error("script error: {0}")]
    Script(#[from] sv_script::ScriptError),
    /// Forwarded primitives error.
    #[error("primitives error: {0}")]
    Primitives(#[from] sv_primitives::PrimitivesError),
}
