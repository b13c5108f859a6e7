#![deny(missing_docs)]

//! Script execution engine for the BSV transaction format.
//!
//! Re-exports the component crates along with the types needed for the
//! common task of verifying a transaction input:
//!
//! ```no_run
//! use sv_engine::{Engine, ScriptFlags, Transaction, TransactionChecker};
//!
//! # fn verify(tx: &Transaction, locking: &sv_engine::script::Script) {
//! let checker = TransactionChecker::new(tx);
//! let flags = ScriptFlags::ENABLE_SIGHASH_FORKID | ScriptFlags::VERIFY_STRICT_ENCODING;
//! let unlocking = tx.inputs[0].unlocking_script.as_ref().unwrap();
//! Engine::new()
//!     .execute(unlocking, locking, flags, Some(&checker), 0)
//!     .unwrap();
//! # }
//! ```

pub use sv_primitives as primitives;
pub use sv_script as script;
pub use sv_transaction as transaction;

pub use sv_script::interpreter::{
    CancellationToken, Config, Engine, InterpreterError, InterpreterErrorCode, ScriptFlags,
};
pub use sv_script::Script;
pub use sv_transaction::{Transaction, TransactionChecker};
