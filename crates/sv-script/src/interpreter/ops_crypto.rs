//! Hashing and signature-checking opcodes.

use num_bigint::BigInt;

use sv_primitives::hash;

use super::error::{InterpreterError, InterpreterErrorCode};
use super::flags::ScriptFlags;
use super::parsed_opcode::{remove_opcode, remove_opcode_by_data, unparse, ParsedOpcode, ParsedScript};
use super::thread::Thread;
use crate::opcodes::OP_CODESEPARATOR;

const SIGHASH_FORKID: u32 = 0x40;
const SIGHASH_ANYONE_CAN_PAY: u32 = 0x80;

pub(crate) enum HashOp {
    Ripemd160,
    Sha1,
    Sha256,
    Hash160,
    Hash256,
}

impl<'a> Thread<'a> {
    pub(crate) fn op_hash(&mut self, op: HashOp) -> Result<(), InterpreterError> {
        let buf = self.dstack.pop()?;
        let digest = match op {
            HashOp::Ripemd160 => hash::ripemd160(&buf).to_vec(),
            HashOp::Sha1 => hash::sha1(&buf).to_vec(),
            HashOp::Sha256 => hash::sha256(&buf).to_vec(),
            HashOp::Hash160 => hash::hash160(&buf).to_vec(),
            HashOp::Hash256 => hash::sha256d(&buf).to_vec(),
        };
        self.dstack.push(digest)
    }

    /// Script code from the most recent OP_CODESEPARATOR onward.
    pub(crate) fn sub_script(&self) -> ParsedScript {
        let skip = if self.last_code_sep > 0 {
            self.last_code_sep + 1
        } else {
            0
        };
        self.scripts[self.script_idx][skip..].to_vec()
    }

    pub(crate) fn op_checksig(&mut self) -> Result<(), InterpreterError> {
        let pub_key = self.dstack.pop()?;
        let full_sig = self.dstack.pop()?;

        if full_sig.is_empty() {
            return self.dstack.push_bool(false);
        }

        let ctx = self.require_tx_context("OP_CHECKSIG")?;

        // The trailing byte of the signature is the sighash directive.
        let directive = full_sig[full_sig.len() - 1] as u32;
        let der_sig = &full_sig[..full_sig.len() - 1];

        self.check_hash_type_encoding(directive)?;
        self.check_signature_encoding(der_sig)?;
        self.check_pub_key_encoding(&pub_key)?;

        let mut sub_script = self.sub_script();
        // Legacy sighash operates on a subscript with the signature pushes
        // and code separators stripped.
        let has_forkid =
            self.has_flag(ScriptFlags::ENABLE_SIGHASH_FORKID) && directive & SIGHASH_FORKID != 0;
        if !has_forkid {
            sub_script = remove_opcode_by_data(&sub_script, &full_sig);
            sub_script = remove_opcode(&sub_script, OP_CODESEPARATOR);
        }
        let script_code = unparse(&sub_script);

        let valid = ctx
            .verify_signature(&full_sig, &pub_key, &script_code, self.input_idx, directive)
            .unwrap_or(false);

        if !valid && self.has_flag(ScriptFlags::VERIFY_NULL_FAIL) && !der_sig.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NullFail,
                "signature not empty on failed checksig",
            ));
        }
        self.dstack.push_bool(valid)
    }

    pub(crate) fn op_checksigverify(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        self.op_checksig()?;
        self.abstract_verify(pop, InterpreterErrorCode::CheckSigVerify)
    }

    pub(crate) fn op_checkmultisig(&mut self) -> Result<(), InterpreterError> {
        // Saturating, so an oversized count trips the limit check below.
        let num_pub_keys = self.dstack.pop_num()?.to_i32();

        if num_pub_keys < 0 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::PubKeyCount,
                format!("pubkey count {} is negative", num_pub_keys),
            ));
        }
        if num_pub_keys as usize > self.cfg.max_pub_keys_per_multisig() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::PubKeyCount,
                format!(
                    "too many pubkeys: {} > {}",
                    num_pub_keys,
                    self.cfg.max_pub_keys_per_multisig()
                ),
            ));
        }

        // Each key counts against the op budget.
        self.num_ops += num_pub_keys as usize;
        if self.num_ops > self.cfg.max_ops() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::TooManyOperations,
                format!("exceeded max operation limit of {}", self.cfg.max_ops()),
            ));
        }

        let mut pub_keys = Vec::with_capacity(num_pub_keys as usize);
        for _ in 0..num_pub_keys {
            pub_keys.push(self.dstack.pop()?);
        }

        let num_signatures = self.dstack.pop_num()?.to_i32();
        if num_signatures < 0 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigCount,
                format!("signature count {} is negative", num_signatures),
            ));
        }
        if num_signatures > num_pub_keys {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigCount,
                format!(
                    "more signatures than pubkeys: {} > {}",
                    num_signatures, num_pub_keys
                ),
            ));
        }

        let mut signatures = Vec::with_capacity(num_signatures as usize);
        for _ in 0..num_signatures {
            signatures.push(self.dstack.pop()?);
        }

        // The historic off-by-one consumes one extra element.
        let dummy = self.dstack.pop()?;
        if self.has_flag(ScriptFlags::STRICT_MULTI_SIG) && !dummy.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigNullDummy,
                format!("multisig dummy has length {} instead of 0", dummy.len()),
            ));
        }

        let mut sub_script = self.sub_script();
        for sig in &signatures {
            sub_script = remove_opcode_by_data(&sub_script, sig);
            sub_script = remove_opcode(&sub_script, OP_CODESEPARATOR);
        }

        let Some(ctx) = self.tx_context else {
            return self.dstack.push_bool(false);
        };

        let script_code = unparse(&sub_script);

        // Greedy ordered matching: signatures must appear in key order.
        let mut success = true;
        let mut remaining_keys = num_pub_keys + 1;
        let mut key_idx: i32 = -1;
        let mut sig_idx: usize = 0;
        let mut remaining_sigs = num_signatures;

        while remaining_sigs > 0 {
            key_idx += 1;
            remaining_keys -= 1;

            if remaining_sigs > remaining_keys {
                success = false;
                break;
            }

            let sig = &signatures[sig_idx];
            let pub_key = &pub_keys[key_idx as usize];

            if sig.is_empty() {
                continue;
            }

            let directive = sig[sig.len() - 1] as u32;
            self.check_hash_type_encoding(directive)?;
            self.check_signature_encoding(&sig[..sig.len() - 1])?;
            self.check_pub_key_encoding(pub_key)?;

            if let Ok(true) =
                ctx.verify_signature(sig, pub_key, &script_code, self.input_idx, directive)
            {
                sig_idx += 1;
                remaining_sigs -= 1;
            }
        }

        if !success
            && self.has_flag(ScriptFlags::VERIFY_NULL_FAIL)
            && signatures.iter().any(|sig| !sig.is_empty())
        {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NullFail,
                "not all signatures empty on failed checkmultisig",
            ));
        }

        self.dstack.push_bool(success)
    }

    pub(crate) fn op_checkmultisigverify(
        &mut self,
        pop: &ParsedOpcode,
    ) -> Result<(), InterpreterError> {
        self.op_checkmultisig()?;
        self.abstract_verify(pop, InterpreterErrorCode::CheckMultiSigVerify)
    }

    pub(crate) fn check_hash_type_encoding(&self, directive: u32) -> Result<(), InterpreterError> {
        if !self.has_flag(ScriptFlags::VERIFY_STRICT_ENCODING) {
            return Ok(());
        }

        let mut hash_type = directive & !SIGHASH_ANYONE_CAN_PAY;

        if self.has_flag(ScriptFlags::VERIFY_BIP143_SIGHASH) {
            hash_type ^= SIGHASH_FORKID;
            if directive & SIGHASH_FORKID == 0 {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::SigHashType,
                    format!("directive 0x{:x} lacks the fork id bit", directive),
                ));
            }
        }

        let base = hash_type & !SIGHASH_FORKID;
        if !(1..=3).contains(&base) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigHashType,
                format!("invalid sighash directive 0x{:x}", directive),
            ));
        }

        if hash_type & SIGHASH_FORKID != 0 {
            if !self.has_flag(ScriptFlags::ENABLE_SIGHASH_FORKID) {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::IllegalForkID,
                    "fork id sighash set without flag",
                ));
            }
        } else if self.has_flag(ScriptFlags::ENABLE_SIGHASH_FORKID) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::IllegalForkID,
                "fork id sighash not set with flag",
            ));
        }

        Ok(())
    }

    pub(crate) fn check_pub_key_encoding(&self, pub_key: &[u8]) -> Result<(), InterpreterError> {
        if !self.has_flag(ScriptFlags::VERIFY_STRICT_ENCODING) {
            return Ok(());
        }
        let well_formed = match pub_key.len() {
            33 => pub_key[0] == 0x02 || pub_key[0] == 0x03,
            65 => pub_key[0] == 0x04,
            _ => false,
        };
        if well_formed {
            Ok(())
        } else {
            Err(InterpreterError::new(
                InterpreterErrorCode::PubKeyType,
                "unsupported public key type",
            ))
        }
    }

    /// Structural DER check on a signature body (without the trailing
    /// directive byte), plus the optional low-S rule.
    pub(crate) fn check_signature_encoding(&self, sig: &[u8]) -> Result<(), InterpreterError> {
        if !self.has_any(&[
            ScriptFlags::VERIFY_DER_SIGNATURES,
            ScriptFlags::VERIFY_LOW_S,
            ScriptFlags::VERIFY_STRICT_ENCODING,
        ]) {
            return Ok(());
        }

        if sig.is_empty() {
            return Ok(());
        }

        let malformed = |msg: String| {
            Err(InterpreterError::new(InterpreterErrorCode::SigDER, msg))
        };

        let sig_len = sig.len();
        if sig_len < 8 {
            return malformed(format!("signature too short: {} < 8", sig_len));
        }
        if sig_len > 72 {
            return malformed(format!("signature too long: {} > 72", sig_len));
        }
        if sig[0] != 0x30 {
            return malformed(format!("wrong sequence tag {:#x}", sig[0]));
        }
        if sig[1] as usize != sig_len - 2 {
            return malformed(format!("bad length byte {} != {}", sig[1], sig_len - 2));
        }

        let r_len = sig[3] as usize;
        let s_type_offset = 4 + r_len;
        let s_len_offset = s_type_offset + 1;

        if s_type_offset >= sig_len {
            return malformed("S type indicator missing".to_string());
        }
        if s_len_offset >= sig_len {
            return malformed("S length missing".to_string());
        }

        let s_offset = s_len_offset + 1;
        let s_len = sig[s_len_offset] as usize;
        if s_offset + s_len != sig_len {
            return malformed("invalid S length".to_string());
        }

        if sig[2] != 0x02 {
            return malformed(format!("R integer marker {:#x} != 0x02", sig[2]));
        }
        if r_len == 0 {
            return malformed("R length is zero".to_string());
        }
        if sig[4] & 0x80 != 0 {
            return malformed("R is negative".to_string());
        }
        if r_len > 1 && sig[4] == 0x00 && sig[5] & 0x80 == 0 {
            return malformed("R value has excess padding".to_string());
        }

        if sig[s_type_offset] != 0x02 {
            return malformed(format!(
                "S integer marker {:#x} != 0x02",
                sig[s_type_offset]
            ));
        }
        if s_len == 0 {
            return malformed("S length is zero".to_string());
        }
        if sig[s_offset] & 0x80 != 0 {
            return malformed("S is negative".to_string());
        }
        if s_len > 1 && sig[s_offset] == 0x00 && sig[s_offset + 1] & 0x80 == 0 {
            return malformed("S value has excess padding".to_string());
        }

        if self.has_flag(ScriptFlags::VERIFY_LOW_S) {
            let half_order = BigInt::parse_bytes(
                b"7FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF5D576E7357A4501DDFE92F46681B20A0",
                16,
            )
            .ok_or_else(|| {
                InterpreterError::new(InterpreterErrorCode::Internal, "bad half-order constant")
            })?;
            let s_value =
                BigInt::from_bytes_be(num_bigint::Sign::Plus, &sig[s_offset..s_offset + s_len]);
            if s_value > half_order {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::SigHighS,
                    "signature S value is unnecessarily high",
                ));
            }
        }

        Ok(())
    }
}
