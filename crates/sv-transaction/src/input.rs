//! Transaction inputs.
//!
//! Wire format is source_txid(32), source_tx_out_index(4 LE), varint
//! script length, unlocking script, sequence_number(4 LE).

use sv_primitives::util::{VarInt, WireReader, WireWriter};
use sv_script::Script;

use crate::output::TransactionOutput;
use crate::TransactionError;

/// Sequence value of a finalized input.
pub const DEFAULT_SEQUENCE_NUMBER: u32 = 0xffff_ffff;

/// One input of a transaction.
///
/// The output being spent can be supplied either as a full
/// `source_transaction` or directly through
/// [`set_source_output`](TransactionInput::set_source_output). The direct
/// output wins when both are present.
#[derive(Clone, Debug)]
pub struct TransactionInput {
    /// Txid of the output being spent, internal byte order.
    pub source_txid: [u8; 32],
    pub source_tx_out_index: u32,
    pub sequence_number: u32,
    /// None until the input is signed.
    pub unlocking_script: Option<Script>,
    pub source_transaction: Option<Box<crate::transaction::Transaction>>,
    source_output: Option<TransactionOutput>,
}

impl TransactionInput {
    pub fn new() -> Self {
        TransactionInput {
            source_txid: [0u8; 32],
            source_tx_out_index: 0,
            sequence_number: DEFAULT_SEQUENCE_NUMBER,
            unlocking_script: None,
            source_transaction: None,
            source_output: None,
        }
    }

    pub fn read_from(reader: &mut WireReader) -> Result<Self, TransactionError> {
        let txid_bytes = reader.read_bytes(32).map_err(|e| {
            TransactionError::SerializationError(format!("reading source txid: {}", e))
        })?;
        let mut source_txid = [0u8; 32];
        source_txid.copy_from_slice(txid_bytes);

        let source_tx_out_index = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading output index: {}", e))
        })?;

        let script_len = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading script length: {}", e))
        })?;
        let script_bytes = reader.read_bytes(script_len.value() as usize).map_err(|e| {
            TransactionError::SerializationError(format!("reading unlocking script: {}", e))
        })?;

        let sequence_number = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading sequence number: {}", e))
        })?;

        let unlocking_script = if script_bytes.is_empty() {
            None
        } else {
            Some(Script::from_bytes(script_bytes))
        };

        Ok(TransactionInput {
            source_txid,
            source_tx_out_index,
            sequence_number,
            unlocking_script,
            source_transaction: None,
            source_output: None,
        })
    }

    pub fn write_to(&self, writer: &mut WireWriter) {
        writer.write_bytes(&self.source_txid);
        writer.write_u32_le(self.source_tx_out_index);

        match &self.unlocking_script {
            Some(script) => writer.write_var_bytes(script.to_bytes()),
            None => writer.write_varint(VarInt::from(0u64)),
        }

        writer.write_u32_le(self.sequence_number);
    }

    pub fn set_source_output(&mut self, output: Option<TransactionOutput>) {
        self.source_output = output;
    }

    /// The output being spent, from the direct source output or by index
    /// into the source transaction.
    pub fn source_tx_output(&self) -> Option<&TransactionOutput> {
        if let Some(ref output) = self.source_output {
            return Some(output);
        }
        self.source_transaction
            .as_ref()
            .and_then(|tx| tx.outputs.get(self.source_tx_out_index as usize))
    }

    pub fn source_tx_satoshis(&self) -> Option<u64> {
        self.source_tx_output().map(|o| o.satoshis)
    }

    pub fn source_tx_script(&self) -> Option<&Script> {
        self.source_tx_output().map(|o| &o.locking_script)
    }
}

impl Default for TransactionInput {
    fn default() -> Self {
        Self::new()
    }
}
