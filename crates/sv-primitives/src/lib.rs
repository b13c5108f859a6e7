//! Cryptographic and wire-format primitives for the script engine:
//! hash functions (SHA-256, SHA-256d, RIPEMD-160, SHA-1, Hash160), the
//! chain hash type for transaction identification, secp256k1 keys and
//! ECDSA signatures, and variable-length integer readers and writers.

pub mod hash;
pub mod chainhash;
pub mod util;
pub mod ec;

mod error;
pub use error::PrimitivesError;
