//! Signature hash computation.
//!
//! Two algorithms exist. The legacy algorithm hashes a substitute copy of
//! the spending transaction with scripts blanked according to the
//! directive. The fork id algorithm (BIP-143 style) hashes a fixed-layout
//! preimage that also commits to the value being spent. The directive's
//! fork id bit selects between them; it is carried in the trailing byte of
//! every signature.

use sv_primitives::hash::sha256d;
use sv_primitives::util::{VarInt, WireWriter};
use sv_script::interpreter::parsed_opcode::{parse_script, remove_opcode, unparse};
use sv_script::opcodes::OP_CODESEPARATOR;
use sv_script::Script;

use crate::transaction::Transaction;
use crate::TransactionError;

/// Sign all inputs and all outputs.
pub const SIGHASH_ALL: u32 = 0x01;
/// Sign all inputs but no outputs.
pub const SIGHASH_NONE: u32 = 0x02;
/// Sign all inputs and only the output paired with the signed input.
pub const SIGHASH_SINGLE: u32 = 0x03;
/// Sign only the current input.
pub const SIGHASH_ANYONECANPAY: u32 = 0x80;
/// Selects the fork id algorithm and provides replay protection.
pub const SIGHASH_FORKID: u32 = 0x40;
/// The default directive.
pub const SIGHASH_ALL_FORKID: u32 = SIGHASH_ALL | SIGHASH_FORKID;
/// Mask extracting the base type from a directive.
pub const SIGHASH_MASK: u32 = 0x1f;

/// Which digest construction a directive selects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SighashAlgorithm {
    Legacy,
    ForkId,
}

impl SighashAlgorithm {
    pub fn from_directive(directive: u32) -> Self {
        if directive & SIGHASH_FORKID != 0 {
            SighashAlgorithm::ForkId
        } else {
            SighashAlgorithm::Legacy
        }
    }
}

/// Reject directives whose base type is not ALL, NONE, or SINGLE.
pub fn validate_directive(directive: u32) -> Result<(), TransactionError> {
    let base = directive & !(SIGHASH_ANYONECANPAY | SIGHASH_FORKID);
    if !(SIGHASH_ALL..=SIGHASH_SINGLE).contains(&base) {
        return Err(TransactionError::InvalidSighashDirective(directive));
    }
    Ok(())
}

/// Compute the digest signed for `input_index`, dispatching on the
/// directive's fork id bit.
pub fn signature_hash(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    directive: u32,
    satoshis: u64,
) -> Result<[u8; 32], TransactionError> {
    if input_index >= tx.inputs.len() {
        return Err(TransactionError::InvalidTransaction(format!(
            "input index {} out of range (tx has {} inputs)",
            input_index,
            tx.inputs.len()
        )));
    }

    match SighashAlgorithm::from_directive(directive) {
        SighashAlgorithm::ForkId => {
            let preimage = calc_preimage(tx, input_index, script_code, directive, satoshis)?;
            Ok(sha256d(&preimage))
        }
        SighashAlgorithm::Legacy => legacy_signature_hash(tx, input_index, script_code, directive),
    }
}

/// Fork id preimage: version, hashPrevouts, hashSequence, outpoint,
/// scriptCode, value, nSequence, hashOutputs, locktime, directive.
pub fn calc_preimage(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    directive: u32,
    satoshis: u64,
) -> Result<Vec<u8>, TransactionError> {
    if input_index >= tx.inputs.len() {
        return Err(TransactionError::InvalidTransaction(format!(
            "input index {} out of range (tx has {} inputs)",
            input_index,
            tx.inputs.len()
        )));
    }

    let input = &tx.inputs[input_index];
    let base_type = directive & SIGHASH_MASK;

    let hash_prevouts = if directive & SIGHASH_ANYONECANPAY == 0 {
        prevouts_hash(tx)
    } else {
        [0u8; 32]
    };

    let hash_sequence = if directive & SIGHASH_ANYONECANPAY == 0
        && base_type != SIGHASH_SINGLE
        && base_type != SIGHASH_NONE
    {
        sequence_hash(tx)
    } else {
        [0u8; 32]
    };

    let hash_outputs = if base_type != SIGHASH_SINGLE && base_type != SIGHASH_NONE {
        outputs_hash(tx, None)
    } else if base_type == SIGHASH_SINGLE && input_index < tx.outputs.len() {
        outputs_hash(tx, Some(input_index))
    } else {
        [0u8; 32]
    };

    let mut writer = WireWriter::with_capacity(256);
    writer.write_u32_le(tx.version);
    writer.write_bytes(&hash_prevouts);
    writer.write_bytes(&hash_sequence);
    writer.write_bytes(&input.source_txid);
    writer.write_u32_le(input.source_tx_out_index);
    writer.write_var_bytes(script_code);
    writer.write_u64_le(satoshis);
    writer.write_u32_le(input.sequence_number);
    writer.write_bytes(&hash_outputs);
    writer.write_u32_le(tx.lock_time);
    writer.write_u32_le(directive);

    Ok(writer.into_bytes())
}

/// Legacy digest: serialize a substitute transaction with scripts blanked
/// per the directive, append the directive, double hash.
fn legacy_signature_hash(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    directive: u32,
) -> Result<[u8; 32], TransactionError> {
    let base_type = directive & SIGHASH_MASK;
    let anyone_can_pay = directive & SIGHASH_ANYONECANPAY != 0;

    // A SINGLE directive with no paired output hashes the constant one.
    if base_type == SIGHASH_SINGLE && input_index >= tx.outputs.len() {
        let mut digest = [0u8; 32];
        digest[0] = 0x01;
        return Ok(digest);
    }

    let sub_script = strip_code_separators(script_code)?;

    let mut writer = WireWriter::with_capacity(256);
    writer.write_u32_le(tx.version);

    // Inputs. ANYONECANPAY keeps only the signed input. Otherwise all
    // inputs appear, the signed one carrying the subscript and the rest
    // blanked, with non-signed sequences zeroed for NONE and SINGLE.
    let zero_other_sequences = base_type == SIGHASH_NONE || base_type == SIGHASH_SINGLE;
    let indices: Vec<usize> = if anyone_can_pay {
        vec![input_index]
    } else {
        (0..tx.inputs.len()).collect()
    };
    writer.write_varint(VarInt::from(indices.len()));
    for idx in indices {
        let input = &tx.inputs[idx];
        writer.write_bytes(&input.source_txid);
        writer.write_u32_le(input.source_tx_out_index);
        if idx == input_index {
            writer.write_var_bytes(&sub_script);
            writer.write_u32_le(input.sequence_number);
        } else {
            writer.write_varint(VarInt::from(0u64));
            writer.write_u32_le(if zero_other_sequences {
                0
            } else {
                input.sequence_number
            });
        }
    }

    // Outputs. NONE drops all, SINGLE keeps outputs up to the signed
    // index with the earlier ones blanked to value -1.
    match base_type {
        SIGHASH_NONE => writer.write_varint(VarInt::from(0u64)),
        SIGHASH_SINGLE => {
            writer.write_varint(VarInt::from(input_index + 1));
            for _ in 0..input_index {
                writer.write_u64_le(u64::MAX);
                writer.write_varint(VarInt::from(0u64));
            }
            let output = &tx.outputs[input_index];
            writer.write_u64_le(output.satoshis);
            writer.write_var_bytes(output.locking_script.to_bytes());
        }
        _ => {
            writer.write_varint(VarInt::from(tx.outputs.len()));
            for output in &tx.outputs {
                output.write_to(&mut writer);
            }
        }
    }

    writer.write_u32_le(tx.lock_time);
    writer.write_u32_le(directive);
    Ok(sha256d(writer.as_bytes()))
}

fn strip_code_separators(script_code: &[u8]) -> Result<Vec<u8>, TransactionError> {
    let script = Script::from_bytes(script_code);
    let parsed = parse_script(&script, false).map_err(|e| {
        TransactionError::SerializationError(format!("parsing script code: {}", e))
    })?;
    Ok(unparse(&remove_opcode(&parsed, OP_CODESEPARATOR))
        .to_bytes()
        .to_vec())
}

fn prevouts_hash(tx: &Transaction) -> [u8; 32] {
    let mut writer = WireWriter::with_capacity(tx.inputs.len() * 36);
    for input in &tx.inputs {
        writer.write_bytes(&input.source_txid);
        writer.write_u32_le(input.source_tx_out_index);
    }
    sha256d(writer.as_bytes())
}

fn sequence_hash(tx: &Transaction) -> [u8; 32] {
    let mut writer = WireWriter::with_capacity(tx.inputs.len() * 4);
    for input in &tx.inputs {
        writer.write_u32_le(input.sequence_number);
    }
    sha256d(writer.as_bytes())
}

fn outputs_hash(tx: &Transaction, only: Option<usize>) -> [u8; 32] {
    let mut writer = WireWriter::new();
    match only {
        Some(n) => writer.write_bytes(&tx.outputs[n].to_bytes()),
        None => {
            for output in &tx.outputs {
                writer.write_bytes(&output.to_bytes());
            }
        }
    }
    sha256d(writer.as_bytes())
}
