//! Interpreter context backed by a spending transaction.
//!
//! [`TransactionChecker`] implements [`TxContext`] so the script engine
//! can verify signatures, locktimes, and sequences against a real
//! transaction while executing its input scripts.

use sv_primitives::ec::{PublicKey, Signature};
use sv_script::interpreter::{InterpreterError, InterpreterErrorCode, TxContext};
use sv_script::Script;

use crate::sighash::{self, SighashAlgorithm};
use crate::transaction::Transaction;

/// Borrowed view of the transaction whose input is being verified.
#[derive(Clone, Copy, Debug)]
pub struct TransactionChecker<'a> {
    tx: &'a Transaction,
}

impl<'a> TransactionChecker<'a> {
    pub fn new(tx: &'a Transaction) -> Self {
        TransactionChecker { tx }
    }

    fn input_satoshis(&self, input_idx: usize) -> Result<u64, InterpreterError> {
        self.tx
            .inputs
            .get(input_idx)
            .and_then(|input| input.source_tx_satoshis())
            .ok_or_else(|| {
                InterpreterError::new(
                    InterpreterErrorCode::Internal,
                    format!("no source output value for input {}", input_idx),
                )
            })
    }
}

impl TxContext for TransactionChecker<'_> {
    fn verify_signature(
        &self,
        full_sig: &[u8],
        pub_key: &[u8],
        sub_script: &Script,
        input_idx: usize,
        sighash_flag: u32,
    ) -> Result<bool, InterpreterError> {
        if full_sig.is_empty() {
            return Ok(false);
        }
        if sighash::validate_directive(sighash_flag).is_err() {
            return Ok(false);
        }

        let Ok(public_key) = PublicKey::from_bytes(pub_key) else {
            return Ok(false);
        };
        let Ok(signature) = Signature::from_der(&full_sig[..full_sig.len() - 1]) else {
            return Ok(false);
        };

        // Legacy digests ignore the spent value, so only the fork id path
        // requires source output info.
        let satoshis = match SighashAlgorithm::from_directive(sighash_flag) {
            SighashAlgorithm::ForkId => self.input_satoshis(input_idx)?,
            SighashAlgorithm::Legacy => 0,
        };

        let digest = sighash::signature_hash(
            self.tx,
            input_idx,
            sub_script.to_bytes(),
            sighash_flag,
            satoshis,
        )
        .map_err(|e| {
            InterpreterError::new(InterpreterErrorCode::Internal, format!("sighash: {}", e))
        })?;

        Ok(signature.verify(&digest, &public_key))
    }

    fn lock_time(&self) -> u32 {
        self.tx.lock_time
    }

    fn tx_version(&self) -> u32 {
        self.tx.version
    }

    fn input_sequence(&self, input_idx: usize) -> u32 {
        self.tx
            .inputs
            .get(input_idx)
            .map(|input| input.sequence_number)
            .unwrap_or(0)
    }
}
