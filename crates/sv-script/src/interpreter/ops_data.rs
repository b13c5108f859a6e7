//! Splice, bitwise and byte-string opcodes.

use super::error::{InterpreterError, InterpreterErrorCode};
use super::parsed_opcode::ParsedOpcode;
use super::scriptnum::{minimally_encode, ScriptNumber};
use super::thread::Thread;

impl<'a> Thread<'a> {
    pub(crate) fn op_cat(&mut self) -> Result<(), InterpreterError> {
        let tail = self.dstack.pop()?;
        let mut joined = self.dstack.pop()?;
        joined.extend_from_slice(&tail);
        if joined.len() > self.cfg.max_element_size() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::ElementTooBig,
                format!(
                    "concatenated size {} exceeds max element size {}",
                    joined.len(),
                    self.cfg.max_element_size()
                ),
            ));
        }
        self.dstack.push(joined)
    }

    pub(crate) fn op_split(&mut self) -> Result<(), InterpreterError> {
        let n = self.dstack.pop_num()?;
        let data = self.dstack.pop()?;
        if n.less_than_int(0) || n.greater_than_int(data.len() as i64) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidSplitRange,
                format!(
                    "split position {} outside 0..={}",
                    n.to_i64(),
                    data.len()
                ),
            ));
        }
        let pos = n.to_int() as usize;
        self.dstack.push(data[..pos].to_vec())?;
        self.dstack.push(data[pos..].to_vec())
    }

    pub(crate) fn op_num2bin(&mut self) -> Result<(), InterpreterError> {
        let width = self.dstack.pop_num()?;
        let raw = self.dstack.pop()?;

        if width.greater_than_int(self.cfg.max_element_size() as i64) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::PushSize,
                format!(
                    "requested width exceeds max element size {}",
                    self.cfg.max_element_size()
                ),
            ));
        }

        let num = ScriptNumber::from_bytes(&raw, raw.len(), false, self.after_genesis)?;
        let mut out = num.to_bytes();

        if width.less_than_int(out.len() as i64) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::ImpossibleEncoding,
                format!(
                    "value needs {} bytes but {} were requested",
                    out.len(),
                    width.to_i64()
                ),
            ));
        }
        if width.equal_int(out.len() as i64) {
            return self.dstack.push(out);
        }

        // Move the sign bit to a fresh most significant byte and zero-pad
        // up to the requested width.
        let mut sign_bit = 0x00u8;
        if let Some(last) = out.last_mut() {
            sign_bit = *last & 0x80;
            *last &= 0x7f;
        }
        while width.greater_than_int((out.len() + 1) as i64) {
            out.push(0x00);
        }
        out.push(sign_bit);

        self.dstack.push(out)
    }

    pub(crate) fn op_bin2num(&mut self) -> Result<(), InterpreterError> {
        let raw = self.dstack.pop()?;
        let minimal = minimally_encode(&raw);
        if minimal.len() > self.cfg.max_number_length() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidNumberRange,
                format!(
                    "script numbers are limited to {} bytes",
                    self.cfg.max_number_length()
                ),
            ));
        }
        self.dstack.push(minimal)
    }

    pub(crate) fn op_size(&mut self) -> Result<(), InterpreterError> {
        let top = self.dstack.peek(0)?;
        self.dstack
            .push_num(&ScriptNumber::new(top.len() as i64, self.after_genesis))
    }

    pub(crate) fn op_invert(&mut self) -> Result<(), InterpreterError> {
        let data = self.dstack.pop()?;
        self.dstack.push(data.iter().map(|b| !b).collect())
    }

    pub(crate) fn op_bitwise(&mut self, f: fn(u8, u8) -> u8) -> Result<(), InterpreterError> {
        let b = self.dstack.pop()?;
        let a = self.dstack.pop()?;
        if a.len() != b.len() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidInputLength,
                "bitwise operands differ in length",
            ));
        }
        let out = a.iter().zip(b.iter()).map(|(&x, &y)| f(x, y)).collect();
        self.dstack.push(out)
    }

    pub(crate) fn op_equal(&mut self) -> Result<(), InterpreterError> {
        let a = self.dstack.pop()?;
        let b = self.dstack.pop()?;
        self.dstack.push_bool(a == b)
    }

    pub(crate) fn op_equalverify(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        self.op_equal()?;
        self.abstract_verify(pop, InterpreterErrorCode::EqualVerify)
    }
}
