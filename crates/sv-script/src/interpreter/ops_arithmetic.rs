//! Numeric opcodes.

use super::error::{InterpreterError, InterpreterErrorCode};
use super::parsed_opcode::ParsedOpcode;
use super::scriptnum::ScriptNumber;
use super::thread::Thread;

impl<'a> Thread<'a> {
    pub(crate) fn op_unary_num(
        &mut self,
        f: impl FnOnce(&mut ScriptNumber),
    ) -> Result<(), InterpreterError> {
        let mut n = self.dstack.pop_num()?;
        f(&mut n);
        self.dstack.push_num(&n)
    }

    pub(crate) fn op_not(&mut self) -> Result<(), InterpreterError> {
        let n = self.dstack.pop_num()?;
        self.push_result_bool(n.is_zero())
    }

    pub(crate) fn op_0notequal(&mut self) -> Result<(), InterpreterError> {
        let mut n = self.dstack.pop_num()?;
        if !n.is_zero() {
            n.set(1);
        }
        self.dstack.push_num(&n)
    }

    pub(crate) fn op_add(&mut self) -> Result<(), InterpreterError> {
        let mut a = self.dstack.pop_num()?;
        let b = self.dstack.pop_num()?;
        self.dstack.push_num(a.add(&b))
    }

    pub(crate) fn op_sub(&mut self) -> Result<(), InterpreterError> {
        let subtrahend = self.dstack.pop_num()?;
        let mut minuend = self.dstack.pop_num()?;
        self.dstack.push_num(minuend.sub(&subtrahend))
    }

    pub(crate) fn op_mul(&mut self) -> Result<(), InterpreterError> {
        let mut a = self.dstack.pop_num()?;
        let b = self.dstack.pop_num()?;
        self.dstack.push_num(a.mul(&b))
    }

    pub(crate) fn op_div(&mut self) -> Result<(), InterpreterError> {
        let divisor = self.dstack.pop_num()?;
        let mut dividend = self.dstack.pop_num()?;
        if divisor.is_zero() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::DivideByZero,
                "division by zero",
            ));
        }
        self.dstack.push_num(dividend.div(&divisor))
    }

    pub(crate) fn op_mod(&mut self) -> Result<(), InterpreterError> {
        let divisor = self.dstack.pop_num()?;
        let mut dividend = self.dstack.pop_num()?;
        if divisor.is_zero() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::DivideByZero,
                "modulo by zero",
            ));
        }
        self.dstack.push_num(dividend.modulo(&divisor))
    }

    pub(crate) fn op_lshift(&mut self) -> Result<(), InterpreterError> {
        let (data, n) = self.pop_shift_operands()?;

        let byte_shift = n / 8;
        let bit_shift = n % 8;
        let mask = 0xffu8 >> bit_shift;

        let mut out = vec![0u8; data.len()];
        for i in (0..data.len()).rev() {
            if byte_shift <= i {
                let k = i - byte_shift;
                out[k] |= (data[i] & mask) << bit_shift;
                if k >= 1 && bit_shift > 0 {
                    out[k - 1] |= (data[i] & !mask) >> (8 - bit_shift);
                }
            }
        }
        self.dstack.push(out)
    }

    pub(crate) fn op_rshift(&mut self) -> Result<(), InterpreterError> {
        let (data, n) = self.pop_shift_operands()?;

        let byte_shift = n / 8;
        let bit_shift = n % 8;
        let mask = 0xffu8 << bit_shift;

        let mut out = vec![0u8; data.len()];
        for (i, &b) in data.iter().enumerate() {
            let k = i + byte_shift;
            if k < data.len() {
                out[k] |= (b & mask) >> bit_shift;
            }
            if k + 1 < data.len() && bit_shift > 0 {
                out[k + 1] |= (b & !mask) << (8 - bit_shift);
            }
        }
        self.dstack.push(out)
    }

    fn pop_shift_operands(&mut self) -> Result<(Vec<u8>, usize), InterpreterError> {
        let n = self.dstack.pop_num()?;
        if n.less_than_int(0) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidNumberRange,
                "shift count is negative",
            ));
        }
        let data = self.dstack.pop()?;
        // Shifting by the full bit width or more always yields zeroes, so
        // larger counts clamp there instead of overflowing the conversion.
        let max_shift = data.len() * 8;
        let count = if n.greater_than_int(max_shift as i64) {
            max_shift
        } else {
            n.to_i64() as usize
        };
        Ok((data, count))
    }

    pub(crate) fn op_bool_binop(
        &mut self,
        f: impl FnOnce(&ScriptNumber, &ScriptNumber) -> bool,
    ) -> Result<(), InterpreterError> {
        let rhs = self.dstack.pop_num()?;
        let lhs = self.dstack.pop_num()?;
        self.push_result_bool(f(&lhs, &rhs))
    }

    /// Push 1 or 0 as a script number.
    fn push_result_bool(&mut self, v: bool) -> Result<(), InterpreterError> {
        let n = if v { 1i64 } else { 0 };
        self.dstack.push_num(&ScriptNumber::new(n, self.after_genesis))
    }

    pub(crate) fn op_numequalverify(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        self.op_bool_binop(|a, b| a.equal(b))?;
        self.abstract_verify(pop, InterpreterErrorCode::NumEqualVerify)
    }

    pub(crate) fn op_min(&mut self) -> Result<(), InterpreterError> {
        let a = self.dstack.pop_num()?;
        let b = self.dstack.pop_num()?;
        self.dstack.push_num(if b.less_than(&a) { &b } else { &a })
    }

    pub(crate) fn op_max(&mut self) -> Result<(), InterpreterError> {
        let a = self.dstack.pop_num()?;
        let b = self.dstack.pop_num()?;
        self.dstack.push_num(if b.greater_than(&a) { &b } else { &a })
    }

    pub(crate) fn op_within(&mut self) -> Result<(), InterpreterError> {
        let max = self.dstack.pop_num()?;
        let min = self.dstack.pop_num()?;
        let x = self.dstack.pop_num()?;
        self.push_result_bool(min.less_than_or_equal(&x) && x.less_than(&max))
    }
}
