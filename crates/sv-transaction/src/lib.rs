//! Transaction wire format, signature hashing, and script verification
//! context.
//!
//! Provides the [`Transaction`] type with inputs and outputs, both legacy
//! and fork-id signature hash algorithms, and [`TransactionChecker`], the
//! bridge that lets the script interpreter verify signatures against a
//! spending transaction.

pub mod checker;
pub mod input;
pub mod output;
pub mod sighash;
pub mod template;
pub mod transaction;

mod error;
pub use checker::TransactionChecker;
pub use error::TransactionError;
pub use input::TransactionInput;
pub use output::TransactionOutput;
pub use transaction::Transaction;
