//! Script templates for standard spend types.

pub mod p2pkh;

use sv_script::Script;

use crate::transaction::Transaction;
use crate::TransactionError;

/// A signing strategy producing unlocking scripts for inputs.
pub trait UnlockingScriptTemplate {
    /// Sign the given input and return its unlocking script.
    fn sign(&self, tx: &Transaction, input_index: u32) -> Result<Script, TransactionError>;

    /// Estimated unlocking script length, for fee calculation before the
    /// signature exists.
    fn estimate_length(&self, tx: &Transaction, input_index: u32) -> u32;
}
